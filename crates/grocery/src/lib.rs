pub mod command;
pub mod grouping;
pub mod reconcile;
pub mod render;
pub mod store;

pub use command::{parse, ParsedCommand, COMMAND_PREFIX, MAX_TOKEN_CHARS};
pub use grouping::{group, DisplayGrouping};
pub use reconcile::{ReconcileConfig, ReconcileWorker};
pub use render::{relative_time, render, render_at};
pub use store::{EntryQuery, GroceryStore, ListFilter, ListQuery};
