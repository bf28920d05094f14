//! Typed IDs for internal records.
//!
//! Every table row the importer touches gets its own ID type so a partner ID
//! can never be passed where a tax ID is expected.

/// Define one or more `i32`-backed ID newtypes.
///
/// Each generated type is `Copy`, hashable, serializes transparently and (with
/// the `postgres` feature) binds and decodes as a Postgres `INT4`.
///
/// ```rust
/// # use channel_sync_core::define_id;
/// define_id!(WidgetId, GadgetId);
///
/// let widget = WidgetId::new(7);
/// assert_eq!(widget.as_i32(), 7);
/// assert_eq!(widget.to_string(), "7");
/// ```
#[macro_export]
macro_rules! define_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Debug,
                Clone,
                Copy,
                PartialEq,
                Eq,
                PartialOrd,
                Ord,
                Hash,
                ::serde::Serialize,
                ::serde::Deserialize
            )]
            #[serde(transparent)]
            pub struct $name(i32);

            impl $name {
                /// Wrap a raw row ID.
                #[must_use]
                pub const fn new(id: i32) -> Self {
                    Self(id)
                }

                /// Raw row ID.
                #[must_use]
                pub const fn as_i32(&self) -> i32 {
                    self.0
                }
            }

            impl ::core::fmt::Display for $name {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    ::core::fmt::Display::fmt(&self.0, f)
                }
            }

            impl From<i32> for $name {
                fn from(id: i32) -> Self {
                    Self(id)
                }
            }

            impl From<$name> for i32 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }

            #[cfg(feature = "postgres")]
            impl ::sqlx::Type<::sqlx::Postgres> for $name {
                fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                    <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
                }

                fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                    <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
                }
            }

            #[cfg(feature = "postgres")]
            impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
                fn decode(
                    value: ::sqlx::postgres::PgValueRef<'r>,
                ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                    <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
                }
            }

            #[cfg(feature = "postgres")]
            impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
                fn encode_by_ref(
                    &self,
                    buf: &mut ::sqlx::postgres::PgArgumentBuffer,
                ) -> ::core::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                    <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
                }
            }
        )+
    };
}

define_id!(
    ChannelId,
    PartnerId,
    ProductId,
    CarrierId,
    CurrencyId,
    PricelistId,
    TaxId,
    SaleOrderId,
    FeedId,
    OrderMappingId,
    PaymentId,
    SyncLogId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_i32() {
        let id = TaxId::new(42);
        let raw: i32 = id.into();
        assert_eq!(raw, 42);
        assert_eq!(TaxId::from(raw), id);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&SaleOrderId::new(9)).unwrap_or_default();
        assert_eq!(json, "9");
    }
}
