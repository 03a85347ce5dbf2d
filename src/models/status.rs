use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declares a snake_case string enum with `as_str`, `Display` and `FromStr`.
/// The stored column value and the JSON value are the same string.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        $name::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                    )),
                }
            }
        }
    };
}

string_enum! {
    OrderStatus {
        Pending => "pending",
        Validated => "validated",
        PaymentProcessing => "payment_processing",
        PaymentConfirmed => "payment_confirmed",
        Assigned => "assigned",
        Preparing => "preparing",
        ReadyForDelivery => "ready_for_delivery",
        OutForDelivery => "out_for_delivery",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

string_enum! {
    PaymentStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

string_enum! {
    DeliveryStatus {
        Pending => "pending",
        Assigned => "assigned",
        PickedUp => "picked_up",
        InTransit => "in_transit",
        Delivered => "delivered",
        Failed => "failed",
    }
}

impl OrderStatus {
    /// Orders that are already on the road or finished can no longer be cancelled.
    pub fn is_cancellable(&self) -> bool {
        !matches!(
            self,
            OrderStatus::OutForDelivery | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }
}
