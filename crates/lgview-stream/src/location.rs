use crate::config::ClientConfig;
use crate::error::ConfigError;
use lgview_model::Location;

/// The configured locations and which one is current.
///
/// Runs copy the current location when they are dispatched, so changing the
/// selection only affects the next run.
#[derive(Debug, Clone)]
pub struct LocationContext {
    locations: Vec<Location>,
    current: Option<usize>,
}

impl LocationContext {
    pub fn new(locations: Vec<Location>) -> Self {
        let current = if locations.is_empty() { None } else { Some(0) };
        Self { locations, current }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.locations())
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn current(&self) -> Option<&Location> {
        self.current.and_then(|index| self.locations.get(index))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn select(&mut self, id: &str) -> Result<&Location, ConfigError> {
        let index = self
            .locations
            .iter()
            .position(|location| location.id == id)
            .ok_or_else(|| ConfigError::UnknownLocation(id.to_string()))?;
        self.current = Some(index);
        tracing::debug!(id, "location selected");
        Ok(&self.locations[index])
    }

    pub fn select_next(&mut self) -> Option<&Location> {
        self.step(1)
    }

    pub fn select_previous(&mut self) -> Option<&Location> {
        self.step(self.locations.len().saturating_sub(1))
    }

    fn step(&mut self, offset: usize) -> Option<&Location> {
        let len = self.locations.len();
        if len == 0 {
            return None;
        }
        let index = (self.current.unwrap_or(0) + offset) % len;
        self.current = Some(index);
        self.locations.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LocationContext {
        LocationContext::new(
            ["a", "b", "c"]
                .iter()
                .map(|id| Location {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    url: format!("http://{id}.example"),
                })
                .collect(),
        )
    }

    fn current_id(context: &LocationContext) -> Option<&str> {
        context.current().map(|location| location.id.as_str())
    }

    #[test]
    fn first_location_is_current() {
        let context = context();
        assert_eq!(current_id(&context), Some("a"));
        assert_eq!(context.current_index(), Some(0));
    }

    #[test]
    fn cycling_wraps_in_both_directions() {
        let mut context = context();

        assert_eq!(context.select_previous().map(|l| l.id.as_str()), Some("c"));
        assert_eq!(context.select_next().map(|l| l.id.as_str()), Some("a"));
        context.select_next();
        context.select_next();
        assert_eq!(current_id(&context), Some("c"));
        assert_eq!(context.select_next().map(|l| l.id.as_str()), Some("a"));
    }

    #[test]
    fn select_by_id() {
        let mut context = context();
        let selected = context.select("b").unwrap();
        assert_eq!(selected.url, "http://b.example");
        assert_eq!(context.current_index(), Some(1));
    }

    #[test]
    fn unknown_id_keeps_current_location() {
        let mut context = context();
        context.select("c").unwrap();

        let err = context.select("zz").unwrap_err();

        assert!(matches!(err, ConfigError::UnknownLocation(ref id) if id == "zz"));
        assert_eq!(current_id(&context), Some("c"));
    }

    #[test]
    fn empty_context_has_no_current_location() {
        let mut context = LocationContext::new(Vec::new());
        assert!(context.current().is_none());
        assert!(context.current_index().is_none());
        assert!(context.select_next().is_none());
        assert!(context.select_previous().is_none());
        assert!(context.current().is_none());
    }
}
