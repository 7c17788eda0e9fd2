//! Domain layer - Core business entities and logic
//!
//! Accounts, registered GPU instances and the run-state vocabulary shared
//! by the portal handlers and the lifecycle jobs. No infrastructure here.

pub mod instance;
pub mod lifecycle;
pub mod password;
pub mod user;

pub use instance::{
    GpuInstance, InstanceBinding, InstanceChanges, InstanceResponse, NewInstance,
    NewInstanceRecord,
};
pub use lifecycle::{InstanceStatus, PortalAction};
pub use password::Password;
pub use user::{NewUser, NewUserRecord, User, UserChanges, UserPatch, UserResponse, UserState};
