use rust_decimal::Decimal;

use crate::allergens::Allergen;
use crate::menu::{Dish, Menu};

/// Demo menu used by the CLI and the test suites.
pub fn sample_menu() -> Menu {
    use Allergen::*;

    let mut menu = Menu::default();
    menu.categories.insert(
        "appetizers".to_string(),
        vec![
            dish("Spring Rolls", 699, &[Gluten, Soy], true, false),
            dish("Chicken Wings", 899, &[], false, true),
            dish("Garlic Bread", 499, &[Gluten, Dairy], true, false),
        ],
    );
    menu.categories.insert(
        "mains".to_string(),
        vec![
            dish("Margherita Pizza", 1299, &[Gluten, Dairy], true, false),
            dish("Grilled Chicken Breast", 1599, &[], false, false),
            dish("Pad Thai", 1399, &[Peanuts, Shellfish, Gluten], false, true),
            dish("Vegetable Curry", 1199, &[Dairy], true, true),
            dish("Beef Burger", 1499, &[Gluten, Dairy], false, false),
            dish("Spaghetti Carbonara", 1349, &[Gluten, Dairy, Eggs], false, false),
        ],
    );
    menu.categories.insert(
        "desserts".to_string(),
        vec![
            dish("Chocolate Cake", 699, &[Gluten, Dairy, Eggs], true, false),
            dish("Ice Cream", 499, &[Dairy], true, false),
            dish("Fruit Salad", 599, &[], true, false),
        ],
    );
    menu.categories.insert(
        "drinks".to_string(),
        vec![
            dish("Coca-Cola", 299, &[], true, false),
            dish("Orange Juice", 399, &[], true, false),
            dish("Coffee", 249, &[], true, false),
            dish("Green Tea", 249, &[], true, false),
        ],
    );
    menu
}

fn dish(name: &str, price_cents: i64, allergens: &[Allergen], vegetarian: bool, spicy: bool) -> Dish {
    Dish {
        name: name.to_string(),
        price: Decimal::new(price_cents, 2),
        allergens: allergens.iter().copied().collect(),
        vegetarian,
        spicy,
    }
}
