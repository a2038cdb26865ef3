//! The listing document model.
//!
//! A `Listing` mirrors the document persisted in the listing store:
//! the browsing cache of record for items whose ownership lives in the
//! external inventory system. Field names serialize in the store's
//! camelCase convention.

use chrono::{DateTime, Utc};
use common::{CatalogItemId, ItemInstanceId, PlayerId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::SessionContext;
use crate::state::ListingState;
use crate::value_objects::{Description, Price};

/// Prefix every well-formed external listing id carries.
///
/// Ids minted by the inventory system's marketplace function look like
/// `marketplace_<itemInstanceId>_<millis>`; rows holding anything else
/// are repaired by the reconciliation service.
pub const LISTING_ID_PREFIX: &str = "marketplace_";

/// A virtual item instance as reported by the inventory system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Instance id of this owned copy.
    pub item_instance_id: ItemInstanceId,
    /// Catalog item the instance was minted from.
    pub item_id: CatalogItemId,
    /// Catalog version; the inventory system defaults to `"main"`.
    #[serde(default)]
    pub catalog_version: Option<String>,
    /// Display name, when the catalog provides one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Free-form custom data in whatever shape the source produced.
    #[serde(default)]
    pub custom_data: Option<Value>,
    /// Remaining-uses counter for consumables.
    #[serde(default)]
    pub remaining_uses: Option<u32>,
}

impl InventoryItem {
    /// The catalog version, falling back to the inventory default.
    pub fn catalog_version_or_default(&self) -> String {
        self.catalog_version
            .clone()
            .unwrap_or_else(|| "main".to_string())
    }

    /// The display title for this item.
    pub fn title(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.item_id.to_string())
    }
}

/// Snapshot of the sold item embedded in the listing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    pub item_id: CatalogItemId,
    pub catalog_version: String,
    pub custom_data: Map<String, Value>,
    pub display_name: Option<String>,
    pub remaining_uses: Option<u32>,
}

/// Seller identity embedded in the listing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfo {
    pub uid: UserId,
    pub email: Option<String>,
    /// Inventory-system identity; best-effort, may be absent.
    pub external_id: Option<PlayerId>,
}

/// How a completed purchase was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Real-money path through the payment processor.
    Processor,
    /// Non-production test path that bypasses payment capture.
    Mock,
}

/// The unit of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    pub price: Price,
    pub owner: UserId,
    /// Inventory-system instance id of the item being sold.
    pub external_item_id: ItemInstanceId,
    pub external_catalog_id: CatalogItemId,
    pub external_catalog_version: String,
    /// Id assigned by the inventory system's marketplace function.
    /// Authoritative once present; repaired when missing or malformed.
    pub external_listing_id: Option<String>,
    /// Seller's inventory-system identity, best-effort.
    pub seller_external_id: Option<PlayerId>,
    pub description: Description,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub purchased: bool,
    pub is_active: bool,
    #[serde(default)]
    pub state: ListingState,
    pub item_details: ItemDetails,
    pub seller_info: SellerInfo,
    // Present only after purchase.
    #[serde(default)]
    pub buyer: Option<UserId>,
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Grant failure detail when `state == FailedGrant`.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl Listing {
    /// Builds the document for a freshly listed item.
    ///
    /// Called only after the inventory system accepted the sale and
    /// returned `external_listing_id`; the document is born
    /// `purchased=false, is_active=true`.
    pub fn from_sale(
        item: &InventoryItem,
        price: Price,
        description: Description,
        seller: &SessionContext,
        external_listing_id: String,
        seller_external_id: Option<PlayerId>,
    ) -> Self {
        let custom_data = crate::custom_data::normalize(item.custom_data.as_ref());
        Self {
            title: item.title(),
            price,
            owner: seller.user.clone(),
            external_item_id: item.item_instance_id.clone(),
            external_catalog_id: item.item_id.clone(),
            external_catalog_version: item.catalog_version_or_default(),
            external_listing_id: Some(external_listing_id),
            seller_external_id: seller_external_id.clone(),
            description,
            created_at: Utc::now(),
            updated_at: None,
            purchased: false,
            is_active: true,
            state: ListingState::Listed,
            item_details: ItemDetails {
                item_id: item.item_id.clone(),
                catalog_version: item.catalog_version_or_default(),
                custom_data,
                display_name: item.display_name.clone(),
                remaining_uses: item.remaining_uses,
            },
            seller_info: SellerInfo {
                uid: seller.user.clone(),
                email: seller.email.clone(),
                external_id: seller_external_id,
            },
            buyer: None,
            purchased_at: None,
            payment_method: None,
            failure_reason: None,
        }
    }

    /// True when the listing can still be bought.
    pub fn is_available(&self) -> bool {
        !self.purchased && self.is_active
    }

    /// True when the purchased/active pair satisfies the invariant
    /// `is_active == !purchased`.
    pub fn flags_consistent(&self) -> bool {
        self.is_active == !self.purchased
    }

    /// True when the external listing id is present and carries the
    /// expected naming convention.
    pub fn has_well_formed_external_id(&self) -> bool {
        self.external_listing_id
            .as_deref()
            .is_some_and(|id| id.starts_with(LISTING_ID_PREFIX))
    }
}

/// A partial update to a listing document.
///
/// Every field is optional; only `Some` fields are written. Store
/// updates are single-document operations with no cross-system
/// atomicity, so patches stay as small as possible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    pub purchased: Option<bool>,
    pub is_active: Option<bool>,
    pub state: Option<ListingState>,
    pub buyer: Option<UserId>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub external_listing_id: Option<String>,
    pub failure_reason: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ListingPatch {
    /// Patch marking a row sold to `buyer`.
    pub fn sold_to(buyer: UserId, method: PaymentMethod) -> Self {
        Self {
            purchased: Some(true),
            is_active: Some(false),
            state: Some(ListingState::Sold),
            buyer: Some(buyer),
            purchased_at: Some(Utc::now()),
            payment_method: Some(method),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Patch recording a successful grant on a sold row.
    pub fn granted() -> Self {
        Self {
            state: Some(ListingState::Granted),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Patch recording a grant failure on a sold row.
    pub fn grant_failed(reason: impl Into<String>) -> Self {
        Self {
            state: Some(ListingState::FailedGrant),
            failure_reason: Some(reason.into()),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Patch restoring the `is_active == !purchased` invariant.
    pub fn normalized_flags(purchased: bool) -> Self {
        Self {
            is_active: Some(!purchased),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Patch replacing a missing or malformed external listing id.
    pub fn replace_external_id(id: impl Into<String>) -> Self {
        Self {
            external_listing_id: Some(id.into()),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// True when the patch would write nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to a listing in place.
    pub fn apply_to(&self, listing: &mut Listing) {
        if let Some(purchased) = self.purchased {
            listing.purchased = purchased;
        }
        if let Some(is_active) = self.is_active {
            listing.is_active = is_active;
        }
        if let Some(state) = self.state {
            listing.state = state;
        }
        if let Some(ref buyer) = self.buyer {
            listing.buyer = Some(buyer.clone());
        }
        if let Some(purchased_at) = self.purchased_at {
            listing.purchased_at = Some(purchased_at);
        }
        if let Some(method) = self.payment_method {
            listing.payment_method = Some(method);
        }
        if let Some(ref external_id) = self.external_listing_id {
            listing.external_listing_id = Some(external_id.clone());
        }
        if let Some(ref reason) = self.failure_reason {
            listing.failure_reason = Some(reason.clone());
        }
        if let Some(updated_at) = self.updated_at {
            listing.updated_at = Some(updated_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> InventoryItem {
        InventoryItem {
            item_instance_id: ItemInstanceId::new("inst-1"),
            item_id: CatalogItemId::new("sword_01"),
            catalog_version: Some("main".to_string()),
            display_name: Some("Iron Sword".to_string()),
            custom_data: Some(json!({"rarity": "rare"})),
            remaining_uses: Some(3),
        }
    }

    fn seller_context() -> SessionContext {
        SessionContext::new(
            UserId::new("seller-uid"),
            Some("seller@example.com".to_string()),
            "ticket-1",
        )
    }

    fn sample_listing() -> Listing {
        Listing::from_sale(
            &sample_item(),
            Price::new(1000).unwrap(),
            Description::empty(),
            &seller_context(),
            "marketplace_inst-1_1700000000000".to_string(),
            Some(PlayerId::new("PF-1")),
        )
    }

    #[test]
    fn from_sale_is_born_available() {
        let listing = sample_listing();
        assert!(!listing.purchased);
        assert!(listing.is_active);
        assert!(listing.is_available());
        assert!(listing.flags_consistent());
        assert_eq!(listing.state, ListingState::Listed);
        assert_eq!(listing.title, "Iron Sword");
        assert_eq!(listing.item_details.custom_data["rarity"], json!("rare"));
        assert_eq!(listing.seller_info.uid.as_str(), "seller-uid");
    }

    #[test]
    fn from_sale_falls_back_to_catalog_id_title() {
        let mut item = sample_item();
        item.display_name = None;
        let listing = Listing::from_sale(
            &item,
            Price::new(500).unwrap(),
            Description::empty(),
            &seller_context(),
            "marketplace_inst-1_1".to_string(),
            None,
        );
        assert_eq!(listing.title, "sword_01");
        assert!(listing.seller_external_id.is_none());
        assert!(listing.seller_info.external_id.is_none());
    }

    #[test]
    fn well_formed_external_id() {
        let mut listing = sample_listing();
        assert!(listing.has_well_formed_external_id());

        listing.external_listing_id = Some("bogus_123".to_string());
        assert!(!listing.has_well_formed_external_id());

        listing.external_listing_id = None;
        assert!(!listing.has_well_formed_external_id());
    }

    #[test]
    fn sold_patch_flips_both_flags() {
        let mut listing = sample_listing();
        let patch = ListingPatch::sold_to(UserId::new("buyer-uid"), PaymentMethod::Mock);
        patch.apply_to(&mut listing);

        assert!(listing.purchased);
        assert!(!listing.is_active);
        assert!(listing.flags_consistent());
        assert_eq!(listing.state, ListingState::Sold);
        assert_eq!(listing.buyer.as_ref().unwrap().as_str(), "buyer-uid");
        assert_eq!(listing.payment_method, Some(PaymentMethod::Mock));
        assert!(listing.purchased_at.is_some());
    }

    #[test]
    fn grant_failed_patch_records_reason() {
        let mut listing = sample_listing();
        ListingPatch::sold_to(UserId::new("b"), PaymentMethod::Processor).apply_to(&mut listing);
        ListingPatch::grant_failed("unknown catalog id").apply_to(&mut listing);

        assert_eq!(listing.state, ListingState::FailedGrant);
        assert_eq!(listing.failure_reason.as_deref(), Some("unknown catalog id"));
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut listing = sample_listing();
        let before = listing.clone();
        let patch = ListingPatch::default();
        assert!(patch.is_empty());
        patch.apply_to(&mut listing);
        assert_eq!(listing, before);
    }

    #[test]
    fn document_serializes_camel_case() {
        let listing = sample_listing();
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["purchased"], json!(false));
        assert_eq!(value["isActive"], json!(true));
        assert_eq!(
            value["externalListingId"],
            json!("marketplace_inst-1_1700000000000")
        );
        assert_eq!(value["itemDetails"]["itemId"], json!("sword_01"));
        assert_eq!(value["sellerInfo"]["uid"], json!("seller-uid"));
    }

    #[test]
    fn payment_method_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Processor).unwrap(),
            "\"processor\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Mock).unwrap(),
            "\"mock\""
        );
    }
}
