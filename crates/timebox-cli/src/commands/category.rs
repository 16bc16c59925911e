//! Category command handlers

use anyhow::{bail, Result};
use clap::Subcommand;
use tabled::{Table, Tabled};
use timebox_core::TimeboxConfig;
use timebox_storage::{Category, CategoryType};

use super::helpers::{open_database, resolve_category, yes_no};

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// Create a category
    Add {
        name: String,
        /// work, health, learning, personal, hobbies, finance, ...
        #[arg(short = 't', long = "type", default_value = "other")]
        category_type: CategoryType,
        /// Hex color such as #3498db
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List categories
    List {
        /// Include inactive categories
        #[arg(short, long)]
        all: bool,
    },
    /// Change fields of a category
    Edit {
        /// Category id or name
        category: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 't', long = "type")]
        category_type: Option<CategoryType>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a category that has no tasks
    Delete {
        /// Category id or name
        category: String,
    },
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Tasks")]
    tasks: i64,
    #[tabled(rename = "Active")]
    active: &'static str,
}

/// Handle category subcommands
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the operation fails
pub fn handle_category_command(config: &TimeboxConfig, action: CategoryAction) -> Result<()> {
    let db = open_database(config)?;
    match action {
        CategoryAction::Add {
            name,
            category_type,
            color,
            icon,
            description,
        } => {
            let mut category = Category::new(name, category_type);
            if let Some(color) = color {
                category.color = color;
            }
            if let Some(icon) = icon {
                category.icon = icon;
            }
            category.description = description.unwrap_or_default();
            let id = db.create_category(&category)?;
            println!("Created category {id}: {}", category.display_name());
        }
        CategoryAction::List { all } => {
            let categories = db.list_categories(!all)?;
            if categories.is_empty() {
                println!("No categories yet. Run `timebox init` to create the defaults.");
                return Ok(());
            }
            let rows = categories
                .iter()
                .map(|c| {
                    Ok(CategoryRow {
                        id: c.id,
                        name: c.display_name(),
                        kind: c.category_type.label(),
                        color: c.color.clone(),
                        tasks: db.count_tasks_in_category(c.id)?,
                        active: yes_no(c.is_active),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            println!("\n{}", Table::new(rows));
        }
        CategoryAction::Edit {
            category,
            name,
            category_type,
            color,
            icon,
            description,
            active,
        } => {
            let mut category = resolve_category(&db, &category)?;
            if let Some(name) = name {
                category.name = name;
            }
            if let Some(category_type) = category_type {
                category.category_type = category_type;
            }
            if let Some(color) = color {
                category.color = color;
            }
            if let Some(icon) = icon {
                category.icon = icon;
            }
            if let Some(description) = description {
                category.description = description;
            }
            if let Some(active) = active {
                category.is_active = active;
            }
            db.update_category(&category)?;
            println!("Updated category {}", category.id);
        }
        CategoryAction::Delete { category } => {
            let category = resolve_category(&db, &category)?;
            let tasks = db.count_tasks_in_category(category.id)?;
            if tasks > 0 {
                bail!(
                    "Cannot delete category with {tasks} existing tasks. Please reassign or delete the tasks first."
                );
            }
            db.delete_category(category.id)?;
            println!("Deleted category {}", category.name);
        }
    }
    Ok(())
}
