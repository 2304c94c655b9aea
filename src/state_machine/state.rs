//! Session state types

use crate::catalog::{Category, MenuReader};
use crate::config::Branding;
use crate::db::{StoredState, UserProfile};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Menu names
// ============================================================================

/// The closed set of menu steps a session can sit in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Menu {
    Registration,
    #[default]
    MainMenu,
    ViewMenu,
    BreakfastMenu,
    AppetizersMenu,
    DrinksMenu,
    MainDishesMenu,
    ItemDetail,
    BookTableMenu,
    MyBookingsMenu,
    ContactMenu,
}

impl Menu {
    pub const ALL: [Menu; 11] = [
        Menu::Registration,
        Menu::MainMenu,
        Menu::ViewMenu,
        Menu::BreakfastMenu,
        Menu::AppetizersMenu,
        Menu::DrinksMenu,
        Menu::MainDishesMenu,
        Menu::ItemDetail,
        Menu::BookTableMenu,
        Menu::MyBookingsMenu,
        Menu::ContactMenu,
    ];

    /// Persisted name of the menu
    pub fn name(self) -> &'static str {
        match self {
            Menu::Registration => "registration",
            Menu::MainMenu => "main_menu",
            Menu::ViewMenu => "view_menu",
            Menu::BreakfastMenu => "breakfast_menu",
            Menu::AppetizersMenu => "appetizers_menu",
            Menu::DrinksMenu => "drinks_menu",
            Menu::MainDishesMenu => "main_dishes_menu",
            Menu::ItemDetail => "item_detail",
            Menu::BookTableMenu => "book_table_menu",
            Menu::MyBookingsMenu => "my_bookings_menu",
            Menu::ContactMenu => "contact_menu",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Category browsed by this menu, if it is a category menu
    pub fn category(self) -> Option<Category> {
        match self {
            Menu::BreakfastMenu => Some(Category::Breakfast),
            Menu::AppetizersMenu => Some(Category::Appetizers),
            Menu::DrinksMenu => Some(Category::Drinks),
            Menu::MainDishesMenu => Some(Category::MainDishes),
            _ => None,
        }
    }

    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Breakfast => Menu::BreakfastMenu,
            Category::Appetizers => Menu::AppetizersMenu,
            Category::Drinks => Menu::DrinksMenu,
            Category::MainDishes => Menu::MainDishesMenu,
        }
    }
}

// ============================================================================
// Drafts - partially collected data for multi-step flows
// ============================================================================

/// Registration progress; absence of a registration draft means no name yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum RegistrationDraft {
    HasFirstName {
        first_name: String,
    },
    /// Both names collected, awaiting confirmation
    HasFullName {
        first_name: String,
        last_name: String,
    },
}

/// Booking progress, one variant per collected prefix of fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BookingDraft {
    /// Date prompt shown
    Started,
    HasDate {
        booking_date: String,
    },
    HasSlot {
        booking_date: String,
        time_slot: String,
    },
    HasPartySize {
        booking_date: String,
        time_slot: String,
        party_size: String,
    },
    /// Every field collected, awaiting confirmation
    Complete {
        booking_date: String,
        time_slot: String,
        party_size: String,
        special_requests: String,
    },
}

/// Scratch data of the session; exactly one flow can own it at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum Draft {
    #[default]
    Empty,
    /// The header of `menu` was rendered during the current visit
    HeaderShown { menu: Menu },
    Registration(RegistrationDraft),
    Booking(BookingDraft),
    /// An item picked from a category, shown by `item_detail`
    Item { category: Category, item_id: i64 },
}

impl Draft {
    pub fn header_shown(&self, menu: Menu) -> bool {
        matches!(self, Draft::HeaderShown { menu: shown } if *shown == menu)
    }
}

// ============================================================================
// Session state
// ============================================================================

/// Where a session is in the menu tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub current_menu: Menu,
    /// Menus left by forward navigation; popped by back navigation
    pub menu_history: Vec<Menu>,
    pub draft: Draft,
}

impl SessionState {
    /// Rebuild state from its persisted form.
    ///
    /// An unknown menu name resets the session to `main_menu` with an empty
    /// draft; an unreadable draft is discarded.
    pub fn restore(stored: &StoredState) -> Self {
        let Some(current_menu) = Menu::from_name(&stored.current_menu) else {
            tracing::warn!(
                menu = %stored.current_menu,
                "Unknown menu in session state, falling back to main_menu"
            );
            return Self::default();
        };

        let menu_history = stored
            .menu_history
            .iter()
            .filter_map(|name| Menu::from_name(name))
            .collect();

        let draft = match &stored.temp_data {
            Value::Null => Draft::Empty,
            Value::Object(fields) if fields.is_empty() => Draft::Empty,
            value => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable session draft");
                Draft::Empty
            }),
        };

        Self {
            current_menu,
            menu_history,
            draft,
        }
    }

    pub fn to_stored(&self) -> StoredState {
        StoredState {
            current_menu: self.current_menu.name().to_string(),
            menu_history: self
                .menu_history
                .iter()
                .map(|m| m.name().to_string())
                .collect(),
            temp_data: match self.draft {
                Draft::Empty => Value::Object(serde_json::Map::new()),
                ref draft => serde_json::to_value(draft).unwrap_or_default(),
            },
        }
    }

    /// Forward navigation
    pub fn enter(&mut self, menu: Menu) {
        self.menu_history.push(self.current_menu);
        self.current_menu = menu;
    }

    /// Back navigation to `menu`
    pub fn back_to(&mut self, menu: Menu) {
        self.menu_history.pop();
        self.current_menu = menu;
    }

    /// Return to the top level with nothing in flight
    pub fn reset(&mut self) {
        self.current_menu = Menu::MainMenu;
        self.menu_history.clear();
        self.draft = Draft::Empty;
    }
}

// ============================================================================
// Turn context
// ============================================================================

/// Read-only inputs for deciding one callback
pub struct MenuContext<'a> {
    pub user: &'a UserProfile,
    pub branding: &'a Branding,
    pub reader: &'a dyn MenuReader,
    /// Bookings dated before this are not "upcoming"
    pub today: NaiveDate,
}

impl<'a> MenuContext<'a> {
    pub fn new(
        user: &'a UserProfile,
        branding: &'a Branding,
        reader: &'a dyn MenuReader,
        today: NaiveDate,
    ) -> Self {
        Self {
            user,
            branding,
            reader,
            today,
        }
    }
}
