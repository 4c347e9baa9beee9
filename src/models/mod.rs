//! Domain models shared by the services and the stores.

/// Text conversions for enums persisted as TEXT columns.
///
/// The literals must match the enum's serde names.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::error::AppError::validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod attrs;
pub mod audit;
pub mod cooperation;
pub mod factor;
pub mod import;
pub mod notification;
pub mod sku;

pub use attrs::SkuAttrs;
pub use audit::AuditLogEntry;
pub use cooperation::{CooperationRelation, CooperationRole, CooperationStatus};
pub use factor::PricingFactor;
pub use import::{ExtractionOutcome, ExtractionResult, ImportStatus, ImportTask};
pub use notification::{NewNotification, Notification, NotificationType};
pub use sku::{
    CalendarDetail, CalendarEntry, Category, OwnerType, PriceCalendar, PriceMode, PriceRule,
    PublicStatus, Sku, SkuStatus, SkuType, VisibilityScope,
};
