//! Category command implementations

use anyhow::Result;
use serde::Serialize;
use tally_core::CategoryTree;

use super::core::Session;

#[derive(Serialize)]
struct CategoryRow {
    id: i64,
    path: String,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    budget: Option<f64>,
    transactions: usize,
}

fn rows(session: &Session) -> Vec<CategoryRow> {
    let mut rows = Vec::new();
    for root in session.tree.roots() {
        push_subtree(session, &session.tree, root, &mut rows);
    }
    rows
}

fn push_subtree(session: &Session, tree: &CategoryTree, id: i64, rows: &mut Vec<CategoryRow>) {
    let Some(category) = tree.get(id) else {
        return;
    };
    rows.push(CategoryRow {
        id,
        path: tree.path(id).unwrap_or_else(|| category.name.clone()),
        depth: tree.depth(id),
        budget: category.budget,
        transactions: session
            .snapshot
            .transactions
            .iter()
            .filter(|tx| tx.category_id == Some(id))
            .count(),
    });
    for &child in tree.children(id) {
        push_subtree(session, tree, child, rows);
    }
}

pub fn cmd_categories(session: &Session) -> Result<()> {
    let rows = rows(session);

    if session.json {
        return super::print_json(&rows);
    }

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");

    if rows.is_empty() {
        println!("   No categories in this snapshot.");
        return Ok(());
    }

    for row in &rows {
        let name = row.path.rsplit(" > ").next().unwrap_or(&row.path);
        let label = format!("{}{}", "  ".repeat(row.depth), name);
        let budget = row
            .budget
            .map(|b| format!("budget ${:.2}", b))
            .unwrap_or_default();
        println!(
            "   {:>4} │ {:28} │ {:>5} tx │ {}",
            row.id, label, row.transactions, budget
        );
    }

    let uncategorized = session
        .snapshot
        .transactions
        .iter()
        .filter(|tx| tx.category_id.is_none())
        .count();
    if uncategorized > 0 {
        println!();
        println!("   {} uncategorized transactions", uncategorized);
    }

    Ok(())
}
