use crate::routes::{parse_routes, route_compare, Route, RouteParseError};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Route chips shown per row before the rest collapses into an ellipsis.
pub const MAX_ROUTE_CHIPS: usize = 18;

/// Inputs of a selection row.
#[derive(Clone, Debug)]
pub struct SelectRowProps {
    /// Icon kind, e.g. "BUS" or "TRAM".
    pub kind: String,
    pub name: String,
    /// Serialized route list.
    pub routes: String,
}

type SelectCallback = Box<dyn Fn(&SelectRowProps)>;

/// A clickable terminal/stop row: sorted route chips, an optional trailing
/// ellipsis, and a callback fired on activation. Holds no other state.
pub struct SelectRow {
    props: SelectRowProps,
    routes: Vec<Route>,
    ellipsis_mode: Option<String>,
    on_select: SelectCallback,
}

impl SelectRow {
    /// Parse and sort the serialized route list. Malformed input is the
    /// caller's problem, not silently rendered as an empty row.
    pub fn new(props: SelectRowProps, on_select: SelectCallback) -> Result<Self, RouteParseError> {
        let mut routes = parse_routes(&props.routes)?;
        routes.sort_by(route_compare);

        let ellipsis_mode = if routes.len() > MAX_ROUTE_CHIPS {
            routes.truncate(MAX_ROUTE_CHIPS + 1);
            Some(routes[MAX_ROUTE_CHIPS].mode.clone())
        } else {
            None
        };

        Ok(Self {
            props,
            routes,
            ellipsis_mode,
            on_select,
        })
    }

    pub fn name(&self) -> &str {
        &self.props.name
    }

    pub fn kind(&self) -> &str {
        &self.props.kind
    }

    /// Invoke the selection callback.
    pub fn activate(&self) {
        (self.on_select)(&self.props);
    }

    /// Visible chips: the first [`MAX_ROUTE_CHIPS`] routes, skipping entries
    /// with no short name (they keep their sort position but render nothing).
    pub fn chips(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .take(MAX_ROUTE_CHIPS)
            .filter(|r| !r.short_name.is_empty())
    }

    pub fn ellipsis_mode(&self) -> Option<&str> {
        self.ellipsis_mode.as_deref()
    }

    /// The row as one terminal line.
    pub fn line(&self, selected: bool) -> Line<'_> {
        let name_style = if selected {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        };

        let mut spans = vec![
            Span::styled(
                format!(" {} ", icon_glyph(&self.props.kind)),
                Style::default().fg(mode_color(&self.props.kind)),
            ),
            Span::styled(format!("{} › ", self.props.name), name_style),
        ];

        for route in self.chips() {
            spans.push(Span::styled(
                format!("{} ", route.short_name),
                Style::default().fg(mode_color(&route.mode)),
            ));
        }

        if let Some(mode) = self.ellipsis_mode() {
            spans.push(Span::styled(
                "...",
                Style::default().fg(mode_color(mode)),
            ));
        }

        Line::from(spans)
    }
}

/// Chip and icon color per transport mode.
fn mode_color(mode: &str) -> Color {
    match mode.to_ascii_uppercase().as_str() {
        "TRAM" => Color::Green,
        "SUBWAY" => Color::LightRed,
        "RAIL" => Color::Magenta,
        "BUS" => Color::Blue,
        "FERRY" => Color::Cyan,
        "CITYBIKE" => Color::Yellow,
        _ => Color::Gray,
    }
}

fn icon_glyph(kind: &str) -> char {
    match kind.to_ascii_uppercase().as_str() {
        "TRAM" => '🚊',
        "SUBWAY" => '🚇',
        "RAIL" => '🚆',
        "FERRY" => '⛴',
        "CITYBIKE" => '🚲',
        _ => '🚌',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn props(routes: &str) -> SelectRowProps {
        SelectRowProps {
            kind: "BUS".to_string(),
            name: "Pasilan asema".to_string(),
            routes: routes.to_string(),
        }
    }

    fn serialize(routes: &[(&str, &str)]) -> String {
        let chunks: Vec<String> = routes
            .iter()
            .map(|(mode, name)| format!(r#"{{"mode":"{mode}","shortName":"{name}"}}"#))
            .collect();
        format!("[{}]", chunks.join(","))
    }

    fn noop() -> SelectCallback {
        Box::new(|_| {})
    }

    #[test]
    fn malformed_routes_propagate_the_error() {
        assert!(SelectRow::new(props("nonsense"), noop()).is_err());
    }

    #[test]
    fn twenty_routes_render_eighteen_chips_and_an_ellipsis() {
        let routes: Vec<(String, String)> = (1..=20)
            .map(|n| ("BUS".to_string(), n.to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = routes
            .iter()
            .map(|(m, n)| (m.as_str(), n.as_str()))
            .collect();
        let row = SelectRow::new(props(&serialize(&refs)), noop()).unwrap();
        assert_eq!(row.chips().count(), 18);
        assert_eq!(row.ellipsis_mode(), Some("BUS"));
    }

    #[test]
    fn eighteen_routes_render_all_chips_without_ellipsis() {
        let routes: Vec<(String, String)> = (1..=18)
            .map(|n| ("BUS".to_string(), n.to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = routes
            .iter()
            .map(|(m, n)| (m.as_str(), n.as_str()))
            .collect();
        let row = SelectRow::new(props(&serialize(&refs)), noop()).unwrap();
        assert_eq!(row.chips().count(), 18);
        assert!(row.ellipsis_mode().is_none());
    }

    #[test]
    fn empty_short_name_contributes_no_chip() {
        let row = SelectRow::new(
            props(&serialize(&[("BUS", "154"), ("BUS", ""), ("BUS", "18")])),
            noop(),
        )
        .unwrap();
        assert_eq!(row.chips().count(), 2);
    }

    #[test]
    fn chips_come_out_sorted() {
        let row = SelectRow::new(
            props(&serialize(&[("BUS", "154"), ("TRAM", "9"), ("BUS", "18")])),
            noop(),
        )
        .unwrap();
        let names: Vec<_> = row.chips().map(|r| r.short_name.as_str()).collect();
        assert_eq!(names, ["9", "18", "154"]);
    }

    #[test]
    fn activation_invokes_the_callback() {
        let fired = Rc::new(Cell::new(false));
        let fired2 = fired.clone();
        let row = SelectRow::new(
            props(&serialize(&[("BUS", "154")])),
            Box::new(move |p| {
                assert_eq!(p.name, "Pasilan asema");
                fired2.set(true);
            }),
        )
        .unwrap();
        row.activate();
        assert!(fired.get());
    }

    #[test]
    fn ellipsis_takes_the_mode_of_the_nineteenth_route() {
        // 18 buses and two trams; trams sort first, so the 19th is a bus.
        let mut routes: Vec<(String, String)> = vec![
            ("TRAM".to_string(), "4".to_string()),
            ("TRAM".to_string(), "7".to_string()),
        ];
        routes.extend((1..=18).map(|n| ("BUS".to_string(), n.to_string())));
        let refs: Vec<(&str, &str)> = routes
            .iter()
            .map(|(m, n)| (m.as_str(), n.as_str()))
            .collect();
        let row = SelectRow::new(props(&serialize(&refs)), noop()).unwrap();
        assert_eq!(row.ellipsis_mode(), Some("BUS"));
    }
}
