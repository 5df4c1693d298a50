//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `InvoiceId` where a `PaymentId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for the acting user (audit fields).");
typed_id!(CompanyId, "Unique identifier for a company (ledger owner).");
typed_id!(AccountId, "Unique identifier for a chart of accounts entry.");
typed_id!(FiscalYearId, "Unique identifier for a fiscal year.");
typed_id!(AccountingPeriodId, "Unique identifier for an accounting period.");
typed_id!(JournalEntryId, "Unique identifier for a journal entry.");
typed_id!(JournalLineId, "Unique identifier for a journal entry line.");
typed_id!(PartyId, "Unique identifier for a customer or supplier.");
typed_id!(InvoiceId, "Unique identifier for a sales or supplier invoice.");
typed_id!(InvoiceLineId, "Unique identifier for an invoice line item.");
typed_id!(PaymentId, "Unique identifier for a payment receipt or voucher.");
typed_id!(AllocationId, "Unique identifier for a payment allocation.");
typed_id!(NoteId, "Unique identifier for a credit or debit note.");
typed_id!(RecurringTemplateId, "Unique identifier for a recurring journal template.");
typed_id!(PurchaseOrderId, "Unique identifier for a purchase order.");
typed_id!(PurchaseOrderLineId, "Unique identifier for a purchase order line.");
typed_id!(GoodsReceiptId, "Unique identifier for a goods received note.");
typed_id!(GoodsReceiptLineId, "Unique identifier for a goods received note line.");
typed_id!(ItemId, "Unique identifier for an inventory or service item.");
typed_id!(InvoiceMatchingId, "Unique identifier for a three-way match result.");
typed_id!(CostCenterId, "Unique identifier for a cost center dimension value.");
typed_id!(DepartmentId, "Unique identifier for a department dimension value.");
typed_id!(ProjectId, "Unique identifier for a project dimension value.");
