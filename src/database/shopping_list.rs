use std::collections::BTreeMap;

use crate::constants::SHOPPING_LIST_HEADER;

/// One ingredient line of a recipe sitting in someone's shopping cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Cart lines summed per (name, measurement unit), ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn aggregate<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = CartLine>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for line in lines {
            *totals
                .entry((line.name, line.measurement_unit))
                .or_insert(0) += i64::from(line.amount);
        }

        let items = totals
            .into_iter()
            .map(|((name, measurement_unit), total)| ShoppingListItem {
                name,
                measurement_unit,
                total,
            })
            .collect();

        Self { items }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render(&self) -> String {
        let mut s = format!("{SHOPPING_LIST_HEADER}\n");

        self.items.iter().for_each(|item| {
            s += &format!(
                "{} - {}/{}\n",
                item.name, item.total, item.measurement_unit
            );
        });

        s
    }
}
