use serde::{Deserialize, Serialize};

/// Commands addressed to a [`Customer`](crate::customer_actor::Customer) entity.
///
/// # Wire Shape
/// Commands are internally tagged (`{"type": "PurchaseItem", "item_name": "..."}`).
/// A tag this build does not know decodes to [`CustomerCommand::Unknown`] instead of
/// failing. The entity reports such a command as unhandled and still confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CustomerCommand {
    /// Append `item_name` to the customer's purchase history.
    PurchaseItem { item_name: String },

    /// Any command shape this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl CustomerCommand {
    pub fn purchase(item_name: impl Into<String>) -> Self {
        Self::PurchaseItem {
            item_name: item_name.into(),
        }
    }
}
