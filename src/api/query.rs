use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("invalid sort order '{other}' (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Everything that determines one list request. A fresh snapshot is taken for
/// every fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<SortSpec>,
    pub search: String,
}

impl QueryDescriptor {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("page_size", self.page_size.max(1).to_string()),
        ];
        params.extend(filter_params(self.sort.as_ref(), &self.search));
        params
    }

    /// Same sort and search, no pagination: exports cover the whole filtered set.
    pub fn export_query(&self) -> ExportQuery {
        ExportQuery {
            sort: self.sort.clone(),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportQuery {
    pub sort: Option<SortSpec>,
    pub search: String,
}

impl ExportQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        filter_params(self.sort.as_ref(), &self.search)
    }
}

fn filter_params(sort: Option<&SortSpec>, search: &str) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(sort) = sort.filter(|sort| !sort.field.is_empty()) {
        params.push(("sort_by", sort.field.clone()));
        params.push(("sort_order", sort.direction.as_str().to_string()));
    }
    let search = search.trim();
    if !search.is_empty() {
        params.push(("search", search.to_string()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(search: &str) -> QueryDescriptor {
        QueryDescriptor {
            page: 2,
            page_size: 10,
            sort: Some(SortSpec::new("nome", SortDirection::Asc)),
            search: search.to_string(),
        }
    }

    #[test]
    fn list_params_carry_pagination_sort_and_search() {
        let params = descriptor("joão").params();
        assert_eq!(
            params,
            vec![
                ("page", "2".to_string()),
                ("page_size", "10".to_string()),
                ("sort_by", "nome".to_string()),
                ("sort_order", "asc".to_string()),
                ("search", "joão".to_string()),
            ]
        );
    }

    #[test]
    fn empty_search_and_missing_sort_are_omitted() {
        let query = QueryDescriptor {
            page: 1,
            page_size: 10,
            sort: None,
            search: String::new(),
        };
        assert_eq!(
            query.params(),
            vec![("page", "1".to_string()), ("page_size", "10".to_string())]
        );
    }

    #[test]
    fn export_query_drops_pagination() {
        let export = descriptor("setor a").export_query();
        let params = export.params();
        assert!(params.iter().all(|(key, _)| *key != "page" && *key != "page_size"));
        assert!(params.contains(&("search", "setor a".to_string())));
        assert!(params.contains(&("sort_by", "nome".to_string())));
    }

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
