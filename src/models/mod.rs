pub mod account;
pub mod todo;

pub use account::{Account, AccountId, AccountSummary, AccountView, NewAccount};
pub use todo::{AttachmentSwap, Todo, TodoInput, TodoQuery, TodoStats, TodoUpdate};
