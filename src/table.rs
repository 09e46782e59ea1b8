//! Searchable, paginated presentation of an in-memory record sequence.
//!
//! Nothing here fetches: callers hand over the complete data set and the
//! view only filters, slices and renders it.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_SEARCH_PLACEHOLDER: &str = "Search...";
pub const DEFAULT_EMPTY_MESSAGE: &str = "No data found";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Bool(v) => v.to_string(),
            FieldValue::Null => String::new(),
        }
    }
}

/// Field lookup by key, the only thing the table needs from a record.
pub trait TableRow {
    fn field(&self, key: &str) -> Option<FieldValue>;
}

impl TableRow for serde_json::Map<String, serde_json::Value> {
    fn field(&self, key: &str) -> Option<FieldValue> {
        let v = self.get(key)?;
        Some(match v {
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::Null => FieldValue::Null,
            other => FieldValue::Text(other.to_string()),
        })
    }
}

pub type CellRenderer<T> = Box<dyn Fn(&T) -> String>;

pub struct Column<T> {
    pub key: String,
    pub header: String,
    pub render: Option<CellRenderer<T>>,
    pub class_name: Option<String>,
}

impl<T> Column<T> {
    pub fn new(key: &str, header: &str) -> Self {
        Column {
            key: key.to_string(),
            header: header.to_string(),
            render: None,
            class_name: None,
        }
    }

    pub fn render_with(mut self, f: impl Fn(&T) -> String + 'static) -> Self {
        self.render = Some(Box::new(f));
        self
    }

    pub fn class_name(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }
}

/// Search term and current page, the only state the table keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    search: String,
    page: usize,
}

impl TableState {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 0;
    }

    pub fn go_to(&mut self, page: usize, total_pages: usize) {
        self.page = page.min(total_pages.saturating_sub(1));
    }

    pub fn next(&mut self, total_pages: usize) {
        if self.page + 1 < total_pages {
            self.page += 1;
        }
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1);
    }
}

pub struct DataTable<T> {
    pub columns: Vec<Column<T>>,
    pub search_key: Option<String>,
    pub search_placeholder: String,
    pub page_size: usize,
    pub empty_message: String,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub key: String,
    pub header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TableBody {
    Loading { colspan: usize },
    Empty { colspan: usize, message: String },
    #[serde(rename_all = "camelCase")]
    Rows { rows: Vec<Vec<String>> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub footer: String,
    pub page_label: String,
    pub can_prev: bool,
    pub can_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_placeholder: Option<String>,
    pub search: String,
    pub body: TableBody,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

pub fn showing_footer(page: usize, page_size: usize, filtered: usize) -> String {
    let first = page * page_size + 1;
    let last = ((page + 1) * page_size).min(filtered);
    format!("Showing {} to {} of {} results", first, last, filtered)
}

impl<T: TableRow> DataTable<T> {
    pub fn new(columns: Vec<Column<T>>) -> Self {
        DataTable {
            columns,
            search_key: None,
            search_placeholder: DEFAULT_SEARCH_PLACEHOLDER.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            loading: false,
        }
    }

    pub fn search_key(mut self, key: &str) -> Self {
        self.search_key = Some(key.to_string());
        self
    }

    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = placeholder.to_string();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn empty_message(mut self, message: &str) -> Self {
        self.empty_message = message.to_string();
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Records passing the search term. Non-text fields are never filtered out.
    pub fn filter<'a>(&self, data: &'a [T], term: &str) -> Vec<&'a T> {
        let Some(key) = self.search_key.as_deref() else {
            return data.iter().collect();
        };
        let needle = term.to_lowercase();
        data.iter()
            .filter(|item| match item.field(key) {
                Some(FieldValue::Text(s)) => s.to_lowercase().contains(&needle),
                _ => true,
            })
            .collect()
    }

    pub fn total_pages(&self, data: &[T], state: &TableState) -> usize {
        total_pages(self.filter(data, state.search()).len(), self.page_size)
    }

    fn render_cell(&self, column: &Column<T>, item: &T) -> String {
        match &column.render {
            Some(f) => f(item),
            None => item
                .field(&column.key)
                .map(|v| v.display())
                .unwrap_or_default(),
        }
    }

    pub fn view(&self, data: &[T], state: &TableState) -> TableView {
        let filtered = self.filter(data, state.search());
        let total = total_pages(filtered.len(), self.page_size);
        let page = state.page().min(total.saturating_sub(1));
        let start = (page * self.page_size).min(filtered.len());
        let end = (start + self.page_size).min(filtered.len());
        let visible = &filtered[start..end];
        let colspan = self.columns.len();

        let body = if self.loading {
            TableBody::Loading { colspan }
        } else if visible.is_empty() {
            TableBody::Empty {
                colspan,
                message: self.empty_message.clone(),
            }
        } else {
            TableBody::Rows {
                rows: visible
                    .iter()
                    .map(|item| {
                        self.columns
                            .iter()
                            .map(|c| self.render_cell(c, item))
                            .collect()
                    })
                    .collect(),
            }
        };

        let pagination = (total > 1).then(|| Pagination {
            footer: showing_footer(page, self.page_size, filtered.len()),
            page_label: format!("Page {} of {}", page + 1, total),
            can_prev: page > 0,
            can_next: page + 1 < total,
        });

        TableView {
            headers: self
                .columns
                .iter()
                .map(|c| HeaderCell {
                    key: c.key.clone(),
                    header: c.header.clone(),
                    class_name: c.class_name.clone(),
                })
                .collect(),
            search_placeholder: self
                .search_key
                .as_ref()
                .map(|_| self.search_placeholder.clone()),
            search: state.search().to_string(),
            body,
            page,
            page_size: self.page_size,
            total_pages: total,
            filtered_count: filtered.len(),
            pagination,
        }
    }

    /// Applies a requested search term then page, in that order, clamping the page.
    pub fn view_at(&self, data: &[T], search: &str, page: usize) -> TableView {
        let mut state = TableState::default();
        state.set_search(search);
        let total = self.total_pages(data, &state);
        state.go_to(page, total);
        self.view(data, &state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn rows(v: Value) -> Vec<Map<String, Value>> {
        v.as_array()
            .expect("array")
            .iter()
            .map(|r| r.as_object().expect("object").clone())
            .collect()
    }

    fn people(n: usize) -> Vec<Map<String, Value>> {
        (0..n)
            .map(|i| {
                json!({ "name": format!("Student {:02}", i), "roll": i })
                    .as_object()
                    .cloned()
                    .expect("object")
            })
            .collect()
    }

    fn body_rows(view: &TableView) -> Vec<Vec<String>> {
        match &view.body {
            TableBody::Rows { rows } => rows.clone(),
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let data = rows(json!([
            { "name": "Alice Brown" },
            { "name": "bob stone" },
            { "name": "Carol BROWNING" }
        ]));
        let table = DataTable::new(vec![Column::new("name", "Name")]).search_key("name");
        let hits: Vec<_> = table
            .filter(&data, "brown")
            .iter()
            .map(|r| r.field("name").unwrap().display())
            .collect();
        assert_eq!(hits, vec!["Alice Brown", "Carol BROWNING"]);
    }

    #[test]
    fn empty_term_returns_everything_in_order() {
        let data = people(4);
        let table = DataTable::new(vec![Column::new("name", "Name")]).search_key("name");
        let all = table.filter(&data, "");
        assert_eq!(all.len(), 4);
        for (i, r) in all.iter().enumerate() {
            assert_eq!(r.field("roll"), Some(FieldValue::Int(i as i64)));
        }
    }

    #[test]
    fn non_text_search_fields_pass_through() {
        let data = rows(json!([{ "roll": 7 }, { "roll": "x7" }, { "other": 1 }]));
        let table = DataTable::new(vec![Column::new("roll", "Roll")]).search_key("roll");
        assert_eq!(table.filter(&data, "zzz").len(), 2);
    }

    #[test]
    fn page_count_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn last_page_is_short_and_footer_matches() {
        let data = people(25);
        let table = DataTable::new(vec![Column::new("name", "Name")]);
        let view = table.view_at(&data, "", 2);
        assert_eq!(view.total_pages, 3);
        assert_eq!(body_rows(&view).len(), 5);
        let p = view.pagination.expect("pagination");
        assert_eq!(p.footer, "Showing 21 to 25 of 25 results");
        assert_eq!(p.page_label, "Page 3 of 3");
        assert!(p.can_prev);
        assert!(!p.can_next);
    }

    #[test]
    fn navigation_is_clamped() {
        let mut state = TableState::default();
        state.prev();
        assert_eq!(state.page(), 0);
        state.next(2);
        state.next(2);
        state.next(2);
        assert_eq!(state.page(), 1);
        state.go_to(99, 2);
        assert_eq!(state.page(), 1);
        state.go_to(5, 0);
        assert_eq!(state.page(), 0);
    }

    #[test]
    fn changing_search_resets_page() {
        let mut state = TableState::default();
        state.go_to(3, 5);
        state.set_search("a");
        assert_eq!(state.page(), 0);
    }

    #[test]
    fn single_page_hides_pagination() {
        let data = people(3);
        let table = DataTable::new(vec![Column::new("name", "Name")]);
        let view = table.view(&data, &TableState::default());
        assert!(view.pagination.is_none());
        assert_eq!(view.search_placeholder, None);
    }

    #[test]
    fn loading_and_empty_span_all_columns() {
        let data = people(3);
        let table = DataTable::new(vec![Column::new("name", "Name"), Column::new("roll", "Roll")])
            .search_key("name")
            .empty_message("No students yet");
        let loading = DataTable {
            loading: true,
            ..DataTable::new(vec![Column::new("name", "Name"), Column::new("roll", "Roll")])
        };
        assert_eq!(
            loading.view(&data, &TableState::default()).body,
            TableBody::Loading { colspan: 2 }
        );
        let view = table.view_at(&data, "nobody", 0);
        assert_eq!(
            view.body,
            TableBody::Empty {
                colspan: 2,
                message: "No students yet".to_string()
            }
        );
    }

    #[test]
    fn custom_renderer_and_missing_fields() {
        let data = rows(json!([{ "name": "Ann", "pct": 80, "ok": true, "none": null }]));
        let table = DataTable::new(vec![
            Column::new("name", "Name"),
            Column::new("pct", "Percent")
                .render_with(|r: &Map<String, Value>| format!("{}%", r.field("pct").unwrap().display())),
            Column::new("ok", "Ok"),
            Column::new("none", "None"),
            Column::new("ghost", "Ghost"),
        ]);
        let view = table.view(&data, &TableState::default());
        assert_eq!(body_rows(&view), vec![vec!["Ann", "80%", "true", "", ""]]);
    }

    #[test]
    fn view_is_deterministic() {
        let data = people(30);
        let table = DataTable::new(vec![Column::new("name", "Name")])
            .search_key("name")
            .page_size(7);
        assert_eq!(table.view_at(&data, "1", 1), table.view_at(&data, "1", 1));
    }
}
