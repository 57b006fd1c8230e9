//! End-to-end lifecycle of `dbtcloud_synapse_credential` against an
//! in-memory backend that behaves like dbt Cloud: it assigns IDs, keeps the
//! field bag, and only ever returns the unencrypted view of it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use dbtcloud_provider::client::{ApiRequest, Transport};
use dbtcloud_provider::testing::{assert_plan_replaces, assert_request_methods, ProviderTester};
use dbtcloud_provider::{async_trait, Client, DbtCloudProvider, ProviderError};
use reqwest::Method;
use serde_json::{json, Value};

const SYNAPSE: &str = "dbtcloud_synapse_credential";
const UNENCRYPTED_FIELDS: [&str; 6] = [
    "authentication",
    "user",
    "client_id",
    "schema",
    "schema_authorization",
    "tenant_id",
];

#[derive(Default)]
struct FakeBackend {
    next_id: Mutex<i64>,
    credentials: Mutex<BTreeMap<i64, Value>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn stored(&self, id: i64) -> Value {
        self.credentials.lock().unwrap()[&id].clone()
    }

    // Simulates someone editing the credential in the dbt Cloud UI.
    fn set_value_out_of_band(&self, id: i64, field: &str, value: &str) {
        let mut credentials = self.credentials.lock().unwrap();
        let credential = credentials.get_mut(&id).unwrap();
        credential["credential_details"]["fields"][field]["value"] = json!(value);
    }

    fn view(credential: &Value) -> Value {
        let fields = &credential["credential_details"]["fields"];
        let unencrypted: serde_json::Map<String, Value> = UNENCRYPTED_FIELDS
            .iter()
            .map(|name| (name.to_string(), fields[*name]["value"].clone()))
            .collect();

        let mut view = credential.clone();
        let object = view.as_object_mut().unwrap();
        object.remove("credential_details");
        object.insert(
            "unencrypted_credential_details".to_string(),
            Value::Object(unencrypted),
        );
        json!({"data": view, "status": {"code": 200, "is_success": true}})
    }

    fn not_found(url: &str) -> ProviderError {
        ProviderError::from_remote(format!("resource-not-found: {url}"))
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        let path = request.url.split('?').next().unwrap_or_default();
        let tail = path.split("/credentials/").nth(1).unwrap_or_default();
        let credential_id = tail.trim_end_matches('/').parse::<i64>().ok();

        let response = match (request.method.clone(), credential_id) {
            (Method::POST, None) => {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                let mut credential = request.body.clone().unwrap();
                credential["id"] = json!(*next_id);
                self.credentials
                    .lock()
                    .unwrap()
                    .insert(*next_id, credential.clone());
                Self::view(&credential)
            },
            (Method::GET, Some(id)) => {
                let credentials = self.credentials.lock().unwrap();
                match credentials.get(&id) {
                    Some(credential) if credential["state"] == 1 => Self::view(credential),
                    _ => return Err(Self::not_found(&request.url)),
                }
            },
            (Method::POST, Some(id)) => {
                let mut credentials = self.credentials.lock().unwrap();
                if !credentials.contains_key(&id) {
                    return Err(Self::not_found(&request.url));
                }
                let credential = request.body.clone().unwrap();
                credentials.insert(id, credential.clone());
                Self::view(&credential)
            },
            _ => {
                return Err(ProviderError::from_remote(format!(
                    "405 Method Not Allowed: {} {}",
                    request.method, request.url
                )))
            },
        };
        Ok(response.to_string().into_bytes())
    }
}

fn setup() -> (Arc<FakeBackend>, ProviderTester<DbtCloudProvider>) {
    let backend = Arc::new(FakeBackend::default());
    let client = Client::new(backend.clone(), "https://cloud.example/api", 1);
    (backend, ProviderTester::new(DbtCloudProvider::with_client(client)))
}

fn alice() -> Value {
    json!({
        "project_id": 3,
        "user": "alice",
        "password": "secret",
        "schema": "analytics"
    })
}

#[tokio::test]
async fn test_create_with_user_password() {
    let (backend, tester) = setup();

    let state = tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();

    let create = &backend.requests()[0];
    assert_eq!(create.method, Method::POST);
    assert_eq!(
        create.url,
        "https://cloud.example/api/v3/accounts/1/projects/3/credentials/"
    );
    let body = create.body.as_ref().unwrap();
    let fields = &body["credential_details"]["fields"];
    assert_eq!(fields["authentication"]["value"], "ActiveDirectoryPassword");
    assert_eq!(fields["user"]["value"], "alice");
    assert_eq!(fields["password"]["value"], "secret");
    assert_eq!(body["type"], "adapter");
    assert_eq!(body["adapter_version"], "synapse_v0");
    assert_eq!(body["state"], 1);

    assert_eq!(state["id"], "3:1");
    assert_eq!(state["credential_id"], 1);
    assert_eq!(state["user"], "alice");
    assert_eq!(state["password"], "secret");
    assert_eq!(state["tenant_id"], "");
}

#[tokio::test]
async fn test_read_takes_user_from_server_and_password_from_state() {
    let (backend, tester) = setup();
    let state = tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();

    backend.set_value_out_of_band(1, "user", "bob");
    let refreshed = tester.read(SYNAPSE, state).await.unwrap().unwrap();

    assert_eq!(refreshed["user"], "bob");
    assert_eq!(refreshed["password"], "secret");
}

#[tokio::test]
async fn test_update_fetches_then_writes_then_reads() {
    let (backend, tester) = setup();
    let state = tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();
    let before = backend.requests().len();

    let mut proposed = alice();
    proposed["schema"] = json!("marts");
    let updated = tester
        .update(SYNAPSE, state.clone(), proposed)
        .await
        .unwrap();

    let methods: Vec<_> = backend.requests()[before..]
        .iter()
        .map(|r| r.method.clone())
        .collect();
    assert_eq!(methods, vec![Method::GET, Method::POST, Method::GET]);
    assert_eq!(updated["schema"], "marts");
    assert_eq!(updated["password"], "secret");
    assert_eq!(
        backend.stored(1)["credential_details"]["fields"]["schema"]["value"],
        "marts"
    );
}

#[tokio::test]
async fn test_switching_auth_mode_is_validated_before_any_call() {
    let (backend, tester) = setup();
    let state = tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();
    let before = backend.requests().len();

    let mut proposed = alice();
    proposed["tenant_id"] = json!("tenant");
    let err = tester.update(SYNAPSE, state, proposed).await.unwrap_err();

    assert!(matches!(err, ProviderError::Validation(_)));
    assert!(err.message().contains("mutually exclusive"));
    assert_eq!(backend.requests().len(), before);
}

#[tokio::test]
async fn test_moving_project_requires_replacement() {
    let (_, tester) = setup();
    let state = tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();

    let mut proposed = alice();
    proposed["project_id"] = json!(4);
    let plan = tester.plan_update(SYNAPSE, state, proposed).await.unwrap();
    assert_plan_replaces(&plan);
}

#[tokio::test]
async fn test_delete_is_one_soft_delete_update() {
    let (backend, tester) = setup();
    let state = tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();
    let before = backend.requests().len();

    tester.lifecycle_delete(SYNAPSE, state.clone()).await.unwrap();

    let requests = backend.requests();
    let delete_calls = &requests[before..];
    let updates: Vec<_> = delete_calls
        .iter()
        .filter(|r| r.method == Method::POST)
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(delete_calls[0].method, Method::GET);

    let body = updates[0].body.as_ref().unwrap();
    let fields = &body["credential_details"]["fields"];
    assert_eq!(body["state"], 2);
    assert_eq!(fields["threads"]["value"], 6);
    assert_eq!(fields["target_name"]["value"], "default");
    assert_eq!(fields["user"]["value"], "");
    assert_eq!(fields["password"]["value"], "");

    // The backend hides soft-deleted credentials.
    assert!(tester.read(SYNAPSE, state).await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_of_unknown_credential_clears_state() {
    let (_, tester) = setup();
    let state = tester
        .read(SYNAPSE, json!({"id": "3:99", "user": "alice"}))
        .await
        .unwrap();
    assert!(state.is_none());
}

#[tokio::test]
async fn test_update_of_unknown_credential_fails() {
    let (_, tester) = setup();
    let err = tester
        .update(
            SYNAPSE,
            json!({"id": "3:99", "project_id": 3, "user": "alice", "password": "a", "schema": "s"}),
            json!({"project_id": 3, "user": "alice", "password": "b", "schema": "s"}),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_import_existing_credential() {
    let (backend, tester) = setup();

    tokio_test::block_on(async {
        tester.lifecycle_create(SYNAPSE, alice()).await.unwrap();

        let imported = tester.import_resource(SYNAPSE, "3:1").await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, SYNAPSE);
        assert_eq!(imported[0].state["user"], "alice");
        assert_eq!(imported[0].state["schema"], "analytics");
        // Secrets cannot be recovered from the backend.
        assert_eq!(imported[0].state["password"], "");
    });

    assert_eq!(backend.requests().last().unwrap().method, Method::GET);
}

#[tokio::test]
async fn test_import_rejects_malformed_and_missing_ids() {
    let (backend, tester) = setup();

    for bad in ["3", "3:1:4", "a:1", "3:"] {
        let err = tester.import_resource(SYNAPSE, bad).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidId(_)), "{bad}");
        assert!(err.message().contains(SYNAPSE));
    }
    assert!(backend.requests().is_empty());

    let err = tester.import_resource(SYNAPSE, "3:42").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_recording_transport_sees_same_sequence() {
    // The scripted transport gives the same get → update sequencing as the fake backend.
    let transport = Arc::new(dbtcloud_provider::testing::RecordingTransport::new());
    let stored = json!({
        "data": {
            "id": 1, "account_id": 1, "project_id": 3, "type": "adapter", "state": 1,
            "unencrypted_credential_details": {"user": "alice", "schema": "analytics"}
        },
        "status": {"code": 200}
    });
    transport.respond_with(stored.clone());
    transport.respond_with(stored);
    let client = Client::new(transport.clone(), "https://cloud.example/api", 1);
    let tester = ProviderTester::new(DbtCloudProvider::with_client(client));

    tester
        .delete(SYNAPSE, json!({"id": "3:1"}))
        .await
        .unwrap();
    assert_request_methods(&transport, &[Method::GET, Method::POST]);
}
