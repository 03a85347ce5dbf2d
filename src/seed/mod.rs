use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::error::AppResult;
use crate::models::{new_id, CateringFirm, Driver, Location, MenuItem};

static FIRM_PREFIXES: &[&str] = &[
    "Healthy", "Green", "Fresh", "Golden", "Sunny", "Urban", "Rustic", "Garden",
    "Harvest", "Coastal", "Little", "Happy",
];

static FIRM_SUFFIXES: &[&str] = &[
    "Bites", "Kitchen", "Table", "Bowl", "Plate", "Pantry", "Eatery", "Catering",
    "Fork", "Spoon",
];

static CUISINES: &[&str] = &[
    "Italian",
    "Mediterranean",
    "Thai",
    "Japanese",
    "Mexican",
    "Indian",
    "Vegan",
    "Greek",
    "Lebanese",
    "Korean",
];

static STREETS: &[&str] = &[
    "Main St", "Broadway", "Oak Ave", "Park Pl", "Market St", "Elm St", "2nd Ave",
    "Hudson St",
];

static DISHES: &[(&str, &str)] = &[
    ("Grilled Chicken Salad", "Main Course"),
    ("Quinoa Power Bowl", "Main Course"),
    ("Salmon Poke", "Main Course"),
    ("Lentil Soup", "Starter"),
    ("Hummus Platter", "Starter"),
    ("Roasted Veggie Wrap", "Main Course"),
    ("Greek Yogurt Parfait", "Dessert"),
    ("Chia Pudding", "Dessert"),
    ("Green Smoothie", "Drinks"),
    ("Cold Brew", "Drinks"),
    ("Falafel Bites", "Starter"),
    ("Tofu Stir Fry", "Main Course"),
];

static DIETARY: &[&str] = &["vegetarian", "vegan", "gluten-free", "dairy-free", "high-protein"];

static INGREDIENTS: &[&str] = &[
    "chicken", "quinoa", "spinach", "avocado", "chickpeas", "salmon", "tofu",
    "lemon", "olive oil", "kale", "tomato", "cucumber",
];

/// Drivers on shift. Fixed positions in Manhattan.
pub fn available_drivers() -> Vec<Driver> {
    vec![
        Driver {
            id: "driver1".to_string(),
            name: "Alex Rivera".to_string(),
            phone: "+1-555-0101".to_string(),
            location: Location { lat: 40.7128, lng: -74.0060 },
        },
        Driver {
            id: "driver2".to_string(),
            name: "Sam Chen".to_string(),
            phone: "+1-555-0102".to_string(),
            location: Location { lat: 40.7589, lng: -73.9851 },
        },
    ]
}

fn pick<'a>(rng: &mut impl Rng, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn random_firm(rng: &mut impl Rng, serial: usize) -> CateringFirm {
    let name = format!("{} {}", pick(rng, FIRM_PREFIXES), pick(rng, FIRM_SUFFIXES));
    let slug = name.to_lowercase().replace(' ', "");

    let cuisine_count = rng.gen_range(1..=3);
    let cuisine_types = CUISINES
        .choose_multiple(rng, cuisine_count)
        .map(|c| c.to_string())
        .collect();

    CateringFirm {
        id: new_id(),
        email: format!("orders{}@{}.com", serial, slug),
        phone: format!("+1-555-{:04}", rng.gen_range(1000..=9999)),
        address: format!("{} {}, New York, NY", rng.gen_range(1..=999), pick(rng, STREETS)),
        name,
        cuisine_types,
        // One decimal place, 3.0 – 5.0
        rating: f64::from(rng.gen_range(30..=50_u8)) / 10.0,
        is_active: rng.gen_bool(0.9),
        operating_hours: Some(serde_json::json!({
            "monday": "9:00-21:00",
            "saturday": "10:00-22:00",
        })),
        menu_items: None,
        created_at: Utc::now(),
    }
}

fn random_menu(rng: &mut impl Rng, firm_id: &str) -> Vec<MenuItem> {
    let count = rng.gen_range(3..=6);
    let dishes: Vec<(&str, &str)> = DISHES.choose_multiple(rng, count).copied().collect();
    let mut menu = Vec::with_capacity(count);

    for (name, category) in dishes {
        let dietary_count = rng.gen_range(0..=2);
        let dietary_info = DIETARY
            .choose_multiple(rng, dietary_count)
            .map(|d| d.to_string())
            .collect();
        let ingredients = INGREDIENTS
            .choose_multiple(rng, 3)
            .map(|i| i.to_string())
            .collect();

        menu.push(MenuItem {
            id: new_id(),
            catering_firm_id: firm_id.to_string(),
            name: name.to_string(),
            description: format!("House {} made fresh daily", name.to_lowercase()),
            // $4.99 – $24.99
            price: f64::from(rng.gen_range(499..=2499_u16)) / 100.0,
            category: category.to_string(),
            dietary_info: Some(dietary_info),
            ingredients: Some(ingredients),
            is_available: rng.gen_bool(0.85),
        });
    }

    menu
}

/// Inserts `count` demo firms, each with a small menu.
pub async fn seed_catering_firms(pool: &SqlitePool, count: usize) -> AppResult<Vec<CateringFirm>> {
    info!("Seeding {} catering firms...", count);

    // StdRng is Send, so it can live across the awaits below
    let mut rng = StdRng::from_entropy();
    let mut firms = Vec::with_capacity(count);

    for serial in 0..count {
        let mut firm = random_firm(&mut rng, serial);
        let menu = random_menu(&mut rng, &firm.id);

        db::catering_firms::insert_firm(pool, &firm).await?;
        for item in &menu {
            db::catering_firms::insert_menu_item(pool, item).await?;
        }

        firm.menu_items = Some(menu);
        firms.push(firm);
    }

    info!("Seeding complete. Total: {} firms", firms.len());
    Ok(firms)
}
