//! Starter catalog written into an empty database

use crate::catalog::Category;

pub(super) struct SeedItem {
    pub category: Category,
    pub name: &'static str,
    pub price_cents: i64,
    pub description: &'static str,
}

pub(super) const SEED_ITEMS: &[SeedItem] = &[
    SeedItem {
        category: Category::Breakfast,
        name: "Full Breakfast",
        price_cents: 65000,
        description: "Eggs, sausage, toast, beans and fruit",
    },
    SeedItem {
        category: Category::Breakfast,
        name: "Pancakes",
        price_cents: 45000,
        description: "Three pancakes with honey and berries",
    },
    SeedItem {
        category: Category::Breakfast,
        name: "Mandazi and Chai",
        price_cents: 20000,
        description: "Two fresh mandazi with spiced tea",
    },
    SeedItem {
        category: Category::Appetizers,
        name: "Beef Samosas",
        price_cents: 30000,
        description: "Four crisp samosas with tamarind dip",
    },
    SeedItem {
        category: Category::Appetizers,
        name: "Chicken Wings",
        price_cents: 55000,
        description: "Six wings in pili pili glaze",
    },
    SeedItem {
        category: Category::Drinks,
        name: "Chai",
        price_cents: 15000,
        description: "Kenyan spiced tea",
    },
    SeedItem {
        category: Category::Drinks,
        name: "Passion Juice",
        price_cents: 25000,
        description: "Freshly pressed passion fruit",
    },
    SeedItem {
        category: Category::Drinks,
        name: "Dawa",
        price_cents: 35000,
        description: "Lime, honey and ginger",
    },
    SeedItem {
        category: Category::MainDishes,
        name: "Nyama Choma",
        price_cents: 120000,
        description: "Grilled goat with kachumbari and ugali",
    },
    SeedItem {
        category: Category::MainDishes,
        name: "Pilau",
        price_cents: 80000,
        description: "Spiced rice with beef",
    },
    SeedItem {
        category: Category::MainDishes,
        name: "Tilapia Fry",
        price_cents: 95000,
        description: "Whole fried tilapia with greens",
    },
];
