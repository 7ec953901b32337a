//! The session cart.
//!
//! The cart is the only checkout state the storefront owns. It records the
//! lines the shopper picked, which remote checkout (if any) mirrors them,
//! and the one-shot latches that keep step loads from repeating mutations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wagwell_core::{
    CartStatus, CheckoutId, CurrencyCode, Frequency, PaymentIntentId, Price, VariantId,
};

use crate::commerce::Attribute;

/// A line in the session cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Stable per-line identifier, also sent to the hosted checkout so it
    /// never merges two lines we keep apart.
    pub key: Uuid,
    pub variant_id: VariantId,
    pub product_handle: String,
    pub sku: Option<String>,
    pub title: String,
    pub quantity: u32,
    /// `Some` for subscription lines.
    pub frequency: Option<Frequency>,
    pub unit_price: Price,
    /// Custom properties (container choice, bump offer marker, ...).
    #[serde(default)]
    pub properties: Vec<Attribute>,
}

impl CartLine {
    #[must_use]
    pub const fn is_subscription(&self) -> bool {
        self.frequency.is_some()
    }

    #[must_use]
    pub fn line_price(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Two lines are the same purchase if they would be indistinguishable
    /// on the checkout.
    fn same_purchase(&self, other: &Self) -> bool {
        self.variant_id == other.variant_id
            && self.frequency == other.frequency
            && self.properties == other.properties
    }
}

/// Which remote checkout mirrors the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutKind {
    Custom,
    Hosted { web_url: String },
}

/// The remote checkout currently associated with the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutAssociation {
    pub id: CheckoutId,
    #[serde(flatten)]
    pub kind: CheckoutKind,
}

impl CheckoutAssociation {
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self.kind, CheckoutKind::Custom)
    }
}

/// A charge waiting on the browser's card challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthentication {
    pub checkout_id: CheckoutId,
    pub payment_intent_id: PaymentIntentId,
}

/// Session-held shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Not persisted: every request starts `Initializing` until the cart
    /// has been loaded from the session.
    #[serde(skip)]
    pub status: CartStatus,
    #[serde(default)]
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub checkout: Option<CheckoutAssociation>,
    /// Discount code waiting to be applied to (or already on) the checkout.
    #[serde(default)]
    pub discount_code: Option<String>,
    /// A checkout sync has run for the current cart contents.
    #[serde(default)]
    pub sync_attempted: bool,
    /// The stored discount code has been re-submitted once.
    #[serde(default)]
    pub discount_synced: bool,
    /// Set once payment succeeds so repeat submissions are rejected.
    #[serde(default)]
    pub completed_checkout_id: Option<CheckoutId>,
    /// Step-up requested by the first charge, consumed by the continuation.
    #[serde(default)]
    pub pending_authentication: Option<PendingAuthentication>,
    /// Email last pushed by the email-only update.
    #[serde(default)]
    pub last_synced_email: Option<String>,
    /// Marketing attribution (`utm_*`, landing page) captured on entry.
    #[serde(default)]
    pub tracking: Vec<Attribute>,
}

impl Cart {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == CartStatus::Ready
    }

    pub fn mark_ready(&mut self) {
        self.status = CartStatus::Ready;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Any line is a subscription.
    #[must_use]
    pub fn has_subscription(&self) -> bool {
        self.lines.iter().any(CartLine::is_subscription)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line prices. Lines in a foreign currency are skipped.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        let currency = self
            .lines
            .first()
            .map_or(CurrencyCode::default(), |l| l.unit_price.currency_code);
        self.lines
            .iter()
            .fold(Price::zero(currency), |total, line| {
                total.checked_add(line.line_price()).unwrap_or(total)
            })
    }

    #[must_use]
    pub fn checkout_id(&self) -> Option<&CheckoutId> {
        self.checkout.as_ref().map(|c| &c.id)
    }

    /// Id of the associated custom checkout, if that is what the cart mirrors.
    #[must_use]
    pub fn custom_checkout_id(&self) -> Option<&CheckoutId> {
        self.checkout
            .as_ref()
            .filter(|c| c.is_custom())
            .map(|c| &c.id)
    }

    #[must_use]
    pub fn line(&self, key: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.key == key)
    }

    /// Add a line, merging it into an identical existing line.
    pub fn add(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.same_purchase(&line)) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
        self.contents_changed();
    }

    /// Remove a line. Returns `false` if no line has that key.
    pub fn remove(&mut self, key: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.key != key);
        let removed = self.lines.len() != before;
        if removed {
            self.contents_changed();
        }
        removed
    }

    /// Switch a line between subscription and one-time purchase.
    /// Returns `false` if no line has that key.
    pub fn set_frequency(&mut self, key: Uuid, frequency: Option<Frequency>) -> bool {
        let Some(line) = self.lines.iter_mut().find(|l| l.key == key) else {
            return false;
        };
        line.frequency = frequency;
        self.contents_changed();
        true
    }

    /// Empty the cart and forget its checkout. Attribution survives.
    pub fn clear(&mut self) {
        let tracking = std::mem::take(&mut self.tracking);
        let status = self.status;
        *self = Self {
            status,
            tracking,
            ..Self::default()
        };
    }

    pub fn associate_checkout(&mut self, id: CheckoutId, kind: CheckoutKind) {
        self.checkout = Some(CheckoutAssociation { id, kind });
    }

    /// Record attribution once per session.
    pub fn record_tracking(&mut self, attributes: Vec<Attribute>) {
        if self.tracking.is_empty() {
            self.tracking = attributes;
        }
    }

    /// Lines changed: the next checkout step load must sync again, and a
    /// pending step-up no longer pays for what is in the cart.
    fn contents_changed(&mut self) {
        self.sync_attempted = false;
        self.pending_authentication = None;
    }
}
