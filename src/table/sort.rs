use crate::api::{SortDirection, SortSpec};

/// Single-column sort selected by the user. `Unsorted` means the dataset's
/// default order applies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortState {
    #[default]
    Unsorted,
    Ascending(String),
    Descending(String),
}

impl SortState {
    /// unsorted → asc → desc → unsorted on the same field; a different field
    /// always starts over at ascending.
    pub fn toggle(&mut self, field: &str) {
        let next = match self {
            SortState::Ascending(current) if current == field => {
                SortState::Descending(field.to_string())
            }
            SortState::Descending(current) if current == field => SortState::Unsorted,
            _ => SortState::Ascending(field.to_string()),
        };
        *self = next;
    }

    pub fn spec(&self) -> Option<SortSpec> {
        match self {
            SortState::Unsorted => None,
            SortState::Ascending(field) => Some(SortSpec::new(field.clone(), SortDirection::Asc)),
            SortState::Descending(field) => {
                Some(SortSpec::new(field.clone(), SortDirection::Desc))
            }
        }
    }

    /// The order actually sent to the server.
    pub fn effective(&self, default: &SortSpec) -> SortSpec {
        self.spec().unwrap_or_else(|| default.clone())
    }

    pub fn reset(&mut self) {
        *self = SortState::Unsorted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_field_cycles_through_three_states() {
        let mut state = SortState::default();
        let mut seen = Vec::new();
        for _ in 0..6 {
            state.toggle("nome");
            seen.push(state.clone());
        }
        assert_eq!(
            seen,
            vec![
                SortState::Ascending("nome".into()),
                SortState::Descending("nome".into()),
                SortState::Unsorted,
                SortState::Ascending("nome".into()),
                SortState::Descending("nome".into()),
                SortState::Unsorted,
            ]
        );
    }

    #[test]
    fn other_field_always_lands_on_ascending() {
        for start in [
            SortState::Unsorted,
            SortState::Ascending("setor".into()),
            SortState::Descending("setor".into()),
        ] {
            let mut state = start;
            state.toggle("nome");
            assert_eq!(state, SortState::Ascending("nome".into()));
        }
    }

    #[test]
    fn unsorted_falls_back_to_default() {
        let default = SortSpec::new("submitted_at", SortDirection::Desc);
        assert_eq!(SortState::Unsorted.effective(&default), default);
        assert_eq!(
            SortState::Ascending("nome".into()).effective(&default),
            SortSpec::new("nome", SortDirection::Asc)
        );
    }
}
