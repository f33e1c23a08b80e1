mod id;
mod time;

pub use id::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use time::{time_millis, workflow_timestamp};
