pub mod sync_bus;
pub mod traits;

pub use sync_bus::{EventBus, SubscriptionId};
pub use traits::{AppEvent, Handler};
