//! Catalog browsing: category list, per-category items and item detail
//!
//! List screens are two-phase per visit. Entering a list renders it and sets
//! the header flag for that menu; every later input during the visit is a
//! selection, including after an invalid one.

use super::state::{Draft, Menu, MenuContext};
use super::transition::{Step, TransitionError, Turn};
use crate::catalog::{menu_choice, Category, MenuItem};

fn categories_text() -> String {
    let mut text = String::from("Menu categories:");
    for (i, category) in Category::ALL.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, category.display_name()));
    }
    text.push_str("\n0. Back");
    text
}

fn items_text(category: Category, items: &[MenuItem]) -> String {
    let mut text = format!("{}:", category.display_name());
    if items.is_empty() {
        text.push_str("\nNo items available right now.");
    }
    for (i, item) in items.iter().enumerate() {
        text.push_str(&format!("\n{}. {} - KES {}", i + 1, item.name, item.price_display()));
    }
    text.push_str("\n0. Back");
    text
}

fn item_text(item: &MenuItem) -> String {
    format!(
        "{}\nKES {}\n{}\n\n0. Back",
        item.name,
        item.price_display(),
        item.description
    )
}

pub(crate) fn view_menu(turn: &mut Turn, _ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    if !turn.state.draft.header_shown(Menu::ViewMenu) {
        turn.state.draft = Draft::HeaderShown {
            menu: Menu::ViewMenu,
        };
        return Ok(Step::proceed(categories_text()));
    }

    let input = turn.input.latest();
    if input == "0" {
        turn.state.draft = Draft::Empty;
        return Ok(Step::Back(Menu::MainMenu));
    }

    match menu_choice(input, Category::ALL.len()) {
        Some(i) => {
            turn.state.draft = Draft::Empty;
            Ok(Step::Enter(Menu::for_category(Category::ALL[i])))
        }
        None => Ok(Step::proceed(format!("Invalid option.\n\n{}", categories_text()))),
    }
}

pub(crate) fn category_menu(turn: &mut Turn, ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    let menu = turn.state.current_menu;
    let Some(category) = menu.category() else {
        turn.state.reset();
        return Ok(Step::Restart);
    };

    let items = ctx.reader.menu_items(category)?;

    if !turn.state.draft.header_shown(menu) {
        turn.state.draft = Draft::HeaderShown { menu };
        return Ok(Step::proceed(items_text(category, &items)));
    }

    let input = turn.input.latest();
    if input == "0" {
        turn.state.draft = Draft::Empty;
        return Ok(Step::Back(Menu::ViewMenu));
    }

    match menu_choice(input, items.len()) {
        Some(i) => {
            turn.state.draft = Draft::Item {
                category,
                item_id: items[i].id,
            };
            Ok(Step::Enter(Menu::ItemDetail))
        }
        None => Ok(Step::proceed(format!(
            "Invalid option.\n\n{}",
            items_text(category, &items)
        ))),
    }
}

pub(crate) fn item_detail(turn: &mut Turn, ctx: &MenuContext<'_>) -> Result<Step, TransitionError> {
    let Draft::Item { category, item_id } = turn.state.draft.clone() else {
        turn.state.reset();
        return Ok(Step::Restart);
    };
    let parent = Menu::for_category(category);

    let item = ctx
        .reader
        .menu_item(item_id)?
        .filter(|item| item.is_available);
    let Some(item) = item else {
        tracing::debug!(item_id, "Menu item gone, returning to category");
        turn.state.draft = Draft::Empty;
        return Ok(Step::Back(parent));
    };

    if turn.input.is_initial() {
        return Ok(Step::proceed(item_text(&item)));
    }

    if turn.input.latest() == "0" {
        turn.state.draft = Draft::Empty;
        return Ok(Step::Back(parent));
    }

    Ok(Step::proceed(format!("Invalid option.\n\n{}", item_text(&item))))
}
