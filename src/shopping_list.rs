use crate::schema::ShoppingListEntry;

pub fn render_shopping_list(entries: &[ShoppingListEntry]) -> String {
    let mut s = String::from("Shopping list\n\n");

    if entries.is_empty() {
        s += "Nothing to buy\n";
        return s;
    }

    entries.iter().for_each(|entry| {
        s += &format!(
            "{} ({}) - {}\n",
            entry.name, entry.measurement_unit, entry.total
        );
    });

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, unit: &str, total: i64) -> ShoppingListEntry {
        ShoppingListEntry {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            total,
        }
    }

    #[test]
    fn renders_one_line_per_entry() {
        let entries = vec![entry("flour", "g", 150), entry("sugar", "g", 20)];
        assert_eq!(
            render_shopping_list(&entries),
            "Shopping list\n\nflour (g) - 150\nsugar (g) - 20\n"
        );
    }

    #[test]
    fn keeps_the_given_order_and_units() {
        let entries = vec![
            entry("apple", "pcs", 3),
            entry("milk", "cup", 1),
            entry("milk", "ml", 500),
            entry("Sugar", "g", 20),
        ];
        assert_eq!(
            render_shopping_list(&entries),
            "Shopping list\n\napple (pcs) - 3\nmilk (cup) - 1\nmilk (ml) - 500\nSugar (g) - 20\n"
        );
    }

    #[test]
    fn large_totals_are_printed_in_full() {
        let entries = vec![entry("rice", "g", 2 * i64::from(i32::MAX))];
        assert!(render_shopping_list(&entries).contains("rice (g) - 4294967294\n"));
    }

    #[test]
    fn renders_empty_cart() {
        assert_eq!(
            render_shopping_list(&[]),
            "Shopping list\n\nNothing to buy\n"
        );
    }
}
