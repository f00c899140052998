//! Status and role enums backed by Postgres enums in the backend.
//!
//! All of them travel as `snake_case` strings, both in JSON rows and in HTML
//! form fields, so each one gets `as_str()`, `Display` and `FromStr` with the
//! same wire spelling.

use serde::{Deserialize, Serialize};

/// Error returned when a status string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, $label:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in workflow order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` spelling stored in the backend.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            /// Human readable label for badges and dropdowns.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Catalog visibility of a product. Only `Active` products are shown on
    /// the public site.
    #[derive(Default)]
    ProductStatus ("product status") {
        #[default]
        Active => "active", "Active";
        Inactive => "inactive", "Inactive";
        OutOfStock => "out_of_stock", "Out of Stock";
    }
}

wire_enum! {
    /// Order lifecycle.
    ///
    /// `Pending → Processing → Shipped → Delivered`, with `Cancelled`
    /// reachable from any non-terminal state.
    #[derive(Default)]
    OrderStatus ("order status") {
        #[default]
        Pending => "pending", "Pending";
        Processing => "processing", "Processing";
        Shipped => "shipped", "Shipped";
        Delivered => "delivered", "Delivered";
        Cancelled => "cancelled", "Cancelled";
    }
}

wire_enum! {
    /// Review stage of an internship application.
    ///
    /// `Pending → Reviewed → Shortlisted → Interviewed → Accepted | Rejected`.
    /// Admins may jump to any stage.
    #[derive(Default)]
    ApplicationStatus ("application status") {
        #[default]
        Pending => "pending", "Pending";
        Reviewed => "reviewed", "Reviewed";
        Shortlisted => "shortlisted", "Shortlisted";
        Interviewed => "interviewed", "Interviewed";
        Accepted => "accepted", "Accepted";
        Rejected => "rejected", "Rejected";
    }
}

wire_enum! {
    /// Whether an internship is taking applications.
    #[derive(Default)]
    InternshipStatus ("internship status") {
        #[default]
        Open => "open", "Open";
        Closed => "closed", "Closed";
        InProgress => "in_progress", "In Progress";
        Completed => "completed", "Completed";
    }
}

wire_enum! {
    /// Role rows in `user_roles`. Admin access is granted by the `Admin` row.
    AppRole ("role") {
        Admin => "admin", "Admin";
        Moderator => "moderator", "Moderator";
        User => "user", "User";
    }
}

impl OrderStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    /// Delivered and cancelled orders do not move again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the admin status dropdown should offer `next` for an order
    /// currently in `self`.
    ///
    /// Staying put is always allowed. Otherwise orders only move forward
    /// through fulfilment, or to `Cancelled` while not yet terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.rank() == next.rank() {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }

    /// Statuses the dropdown offers for an order in `self`, current first.
    #[must_use]
    pub fn reachable(self) -> Vec<Self> {
        let mut out = vec![self];
        out.extend(
            Self::ALL
                .iter()
                .copied()
                .filter(|next| *next != self && self.can_transition_to(*next)),
        );
        out
    }
}

impl InternshipStatus {
    /// Only open internships accept new applications.
    #[must_use]
    pub const fn accepts_applications(self) -> bool {
        matches!(self, Self::Open)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_spelling_matches_serde() {
        for status in ProductStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(
            serde_json::from_str::<InternshipStatus>("\"in_progress\"").unwrap(),
            InternshipStatus::InProgress
        );
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "archived".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.to_string(), "invalid order status: archived");
        assert_eq!("admin".parse::<AppRole>().unwrap(), AppRole::Admin);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ProductStatus::OutOfStock.label(), "Out of Stock");
        assert_eq!(ApplicationStatus::Shortlisted.to_string(), "shortlisted");
    }

    #[test]
    fn test_order_forward_progress() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_order_cancel_only_when_not_terminal() {
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_order_reachable_lists_current_first() {
        assert_eq!(
            OrderStatus::Shipped.reachable(),
            vec![
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                OrderStatus::Cancelled
            ]
        );
        assert_eq!(
            OrderStatus::Delivered.reachable(),
            vec![OrderStatus::Delivered]
        );
    }

    #[test]
    fn test_application_every_status_listed() {
        assert_eq!(ApplicationStatus::ALL.len(), 6);
        assert_eq!(ApplicationStatus::default(), ApplicationStatus::Pending);
    }

    #[test]
    fn test_internship_accepts_applications() {
        assert!(InternshipStatus::Open.accepts_applications());
        assert!(!InternshipStatus::Closed.accepts_applications());
    }
}
