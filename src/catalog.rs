//! Static catalog data and the read interface the menu core consumes

use crate::db::{Booking, DbResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A bookable time slot: stored value and display label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub value: &'static str,
    pub label: &'static str,
}

/// Ordered slot catalog; menu numbering is 1-based over this list
pub const TIME_SLOTS: &[TimeSlot] = &[
    TimeSlot {
        value: "08:00",
        label: "08:00 AM - 10:00 AM",
    },
    TimeSlot {
        value: "11:00",
        label: "11:00 AM - 01:00 PM",
    },
    TimeSlot {
        value: "17:00",
        label: "05:00 PM - 07:00 PM",
    },
    TimeSlot {
        value: "20:00",
        label: "08:00 PM - 10:00 PM",
    },
];

/// 0-based index of a 1-based keypad choice from a list of `len` entries.
///
/// Only plain digits count; signs and whitespace are rejected.
pub fn menu_choice(input: &str, len: usize) -> Option<usize> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = input.parse().ok()?;
    (1..=len).contains(&index).then(|| index - 1)
}

/// Resolve a 1-based menu selection into a slot
pub fn slot_for_selection(selection: &str) -> Option<&'static TimeSlot> {
    menu_choice(selection, TIME_SLOTS.len()).map(|i| &TIME_SLOTS[i])
}

pub fn slot_by_value(value: &str) -> Option<&'static TimeSlot> {
    TIME_SLOTS.iter().find(|slot| slot.value == value)
}

/// Human-readable label for a stored slot value, falling back to the raw value
pub fn slot_label(value: &str) -> &str {
    slot_by_value(value).map_or(value, |slot| slot.label)
}

/// Menu categories, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Breakfast,
    Appetizers,
    Drinks,
    MainDishes,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Breakfast,
        Category::Appetizers,
        Category::Drinks,
        Category::MainDishes,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Category::Breakfast => "breakfast",
            Category::Appetizers => "appetizers",
            Category::Drinks => "drinks",
            Category::MainDishes => "main_dishes",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Breakfast => "Breakfast",
            Category::Appetizers => "Appetizers",
            Category::Drinks => "Drinks",
            Category::MainDishes => "Main Dishes",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

/// A dish or drink on the menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub category: Category,
    pub name: String,
    pub price_cents: i64,
    pub description: String,
    pub is_available: bool,
}

impl MenuItem {
    pub fn price_display(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// Read-only collaborator queried while deciding a turn
pub trait MenuReader: Send + Sync {
    /// Available items in a category, in display order
    fn menu_items(&self, category: Category) -> DbResult<Vec<MenuItem>>;

    fn menu_item(&self, id: i64) -> DbResult<Option<MenuItem>>;

    /// Bookings for a phone number dated on or after `from`
    fn upcoming_bookings(&self, phone_number: &str, from: NaiveDate) -> DbResult<Vec<Booking>>;
}
