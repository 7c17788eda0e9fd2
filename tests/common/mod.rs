//! Shared fixtures for the integration tests: an in-memory database, a
//! wiremock stand-in for the GPU provider and services wired like `serve`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gpu_portal::config::Config;
use gpu_portal::domain::{NewInstance, NewUser, User};
use gpu_portal::infra::{Database, GpuVendorClient, InstanceLocks, Persistence, VendorApi};
use gpu_portal::jobs::Reconciler;
use gpu_portal::services::{
    ensure_admin, InstanceRegistry, InstanceService, Portal, UserManager, UserService,
};
use gpu_portal::AppState;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-32chars";
pub const ADMIN_PASSWORD: &str = "admin-password-123";
pub const USER_PASSWORD: &str = "user-password-123";
pub const VENDOR_TOKEN: &str = "vendor-test-token";

pub const LIST_PATH: &str = "/api/v1/jupyter/list_instance_pages";
pub const ACTION_PATH: &str = "/api/v1/inferring-api/webide/";

pub const RUNNING: i32 = 3;
pub const STOPPED: i32 = 5;

pub fn test_config() -> Config {
    Config::with_jwt_secret(TEST_SECRET)
        .with_vendor_token(VENDOR_TOKEN)
        .with_seed_admin_password(ADMIN_PASSWORD)
}

pub async fn setup_db() -> Arc<Database> {
    let db = Database::connect_url("sqlite::memory:")
        .await
        .expect("open in-memory database");
    db.run_migrations().await.expect("run migrations");
    Arc::new(db)
}

/// Listing payload in the provider's wire format.
pub fn listing(instances: &[(i64, &str, i32)]) -> Value {
    let data_list: Vec<Value> = instances
        .iter()
        .map(|(id, uuid, status)| {
            json!({
                "webide_instance_id": id,
                "webide_instance_uuid": uuid,
                "webide_instance_name": format!("inst-{id}"),
                "nick_name": format!("nick-{id}"),
                "status": status,
                "jupyter_url": format!("https://jupyter.example.com/{id}")
            })
        })
        .collect();
    json!({
        "code": 200,
        "msg": "ok",
        "data": { "dataList": data_list, "totalRecord": instances.len() }
    })
}

pub async fn mount_listing(server: &MockServer, instances: &[(i64, &str, i32)]) {
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(instances)))
        .mount(server)
        .await;
}

/// Accept start/stop commands, asserting how many arrive.
pub async fn mount_action(server: &MockServer, expected: u64) {
    Mock::given(method("PUT"))
        .and(path(ACTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "msg": "ok"})))
        .expect(expected)
        .mount(server)
        .await;
}

/// Services over one database and one mock provider, sharing one lock map.
pub struct Harness {
    pub config: Config,
    pub database: Arc<Database>,
    pub uow: Arc<Persistence>,
    pub vendor: Arc<dyn VendorApi>,
    pub locks: InstanceLocks,
    pub server: MockServer,
    pub users: UserManager<Persistence>,
    pub instances: InstanceRegistry<Persistence>,
    pub portal: Portal<Persistence>,
    pub admin: User,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let server = MockServer::start().await;
        let database = setup_db().await;
        let uow = Arc::new(Persistence::new(database.get_connection()));

        let admin = ensure_admin(uow.as_ref(), &config)
            .await
            .expect("bootstrap admin")
            .expect("admin created");

        let vendor: Arc<dyn VendorApi> = Arc::new(
            GpuVendorClient::new(&format!("{}/api/v1", server.uri()), Duration::from_secs(5))
                .expect("vendor client"),
        );
        let locks = InstanceLocks::new();
        let default_token = config.vendor_bearer_token().map(str::to_string);

        Self {
            users: UserManager::new(uow.clone(), config.max_users_per_admin),
            instances: InstanceRegistry::new(uow.clone(), vendor.clone(), default_token.clone()),
            portal: Portal::new(uow.clone(), vendor.clone(), locks.clone(), default_token),
            config,
            database,
            uow,
            vendor,
            locks,
            server,
            admin,
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        use gpu_portal::infra::UnitOfWork;
        Reconciler::from_config(
            self.uow.users(),
            self.vendor.clone(),
            self.locks.clone(),
            &self.config,
        )
    }

    pub fn app_state(&self) -> AppState {
        AppState::from_config(
            self.database.clone(),
            self.config.clone(),
            self.vendor.clone(),
            self.locks.clone(),
        )
    }

    /// Register an instance the mock provider already lists.
    pub async fn register(&self, instance_uuid: &str, nickname: &str) -> gpu_portal::domain::GpuInstance {
        self.instances
            .register(NewInstance {
                instance_uuid: instance_uuid.to_string(),
                nickname: nickname.to_string(),
                target_url: Some(format!("https://{nickname}.example.com/lab")),
                bearer_token: None,
            })
            .await
            .expect("register instance")
    }

    pub async fn create_user(&self, username: &str, gpu_instance_id: Option<i32>) -> User {
        self.users
            .create_user(
                self.admin.id,
                NewUser {
                    username: username.to_string(),
                    password: USER_PASSWORD.to_string(),
                    gpu_instance_id,
                    ..Default::default()
                },
            )
            .await
            .expect("create user")
    }
}
