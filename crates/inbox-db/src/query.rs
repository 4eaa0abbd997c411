//! Minimal read-query builder for the PostgREST wire format.
//!
//! Covers what the inbox needs: column selection, one-level foreign-key
//! embeds, equality filters and a single ordering.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Field(&'static str),
    /// `alias:table!fkey(fields...)`
    Embed {
        alias: &'static str,
        table: &'static str,
        fkey: &'static str,
        fields: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    table: &'static str,
    columns: Vec<Column>,
    filters: Vec<(&'static str, String)>,
    order: Option<(&'static str, Order)>,
}

impl Select {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn columns(mut self, names: &[&'static str]) -> Self {
        self.columns.extend(names.iter().copied().map(Column::Field));
        self
    }

    pub fn embed(
        mut self,
        alias: &'static str,
        table: &'static str,
        fkey: &'static str,
        fields: &'static [&'static str],
    ) -> Self {
        self.columns.push(Column::Embed {
            alias,
            table,
            fkey,
            fields,
        });
        self
    }

    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push((column, value.to_string()));
        self
    }

    pub fn order(mut self, column: &'static str, order: Order) -> Self {
        self.order = Some((column, order));
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// The `select=` value, e.g. `id,subject,senders:senders!fk(id,sender_name)`.
    pub fn select_clause(&self) -> String {
        if self.columns.is_empty() {
            return "*".to_string();
        }

        self.columns
            .iter()
            .map(|column| match column {
                Column::Field(name) => (*name).to_string(),
                Column::Embed {
                    alias,
                    table,
                    fkey,
                    fields,
                } => format!("{alias}:{table}!{fkey}({})", fields.join(",")),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Query-string pairs in the order PostgREST documents them.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select_clause())];

        for (column, value) in &self.filters {
            pairs.push(((*column).to_string(), format!("eq.{value}")));
        }

        if let Some((column, order)) = self.order {
            let direction = match order {
                Order::Asc => "asc",
                Order::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{column}.{direction}")));
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_embed_filter_and_order() {
        let select = Select::from("messages")
            .columns(&["id", "subject"])
            .embed("senders", "senders", "messages_sender_id_fkey", &["id", "sender_name"])
            .eq("receiver_id", 1)
            .order("id", Order::Desc);

        assert_eq!(select.table(), "messages");
        assert_eq!(
            select.to_query_pairs(),
            vec![
                (
                    "select".to_string(),
                    "id,subject,senders:senders!messages_sender_id_fkey(id,sender_name)".to_string()
                ),
                ("receiver_id".to_string(), "eq.1".to_string()),
                ("order".to_string(), "id.desc".to_string()),
            ]
        );
    }

    #[test]
    fn empty_selection_means_all_columns() {
        let select = Select::from("receivers").eq("email", "a@example.com");
        assert_eq!(select.select_clause(), "*");
        assert_eq!(
            select.to_query_pairs()[1],
            ("email".to_string(), "eq.a@example.com".to_string())
        );
    }
}
