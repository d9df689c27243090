use async_trait::async_trait;
use countrydesk_core::Column;

/// Asynchronous yes/no prompt guarding destructive actions.
///
/// Resolves only on an explicit user choice; there is no timeout and no default answer.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Something the view layer should show or react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
    /// An item was appended; the view scrolls to it.
    ScrollToEnd {
        column: Column,
        group: Option<usize>,
        index: usize,
    },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
