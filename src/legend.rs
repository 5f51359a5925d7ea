use serde::Serialize;

use crate::constants::LEGEND_POSITION;

pub const LEGEND_INTERVALS: [i32; 6] = [-10, 10, 30, 50, 70, 90];
pub const LEGEND_COLORS: [&str; 6] = ["green", "#cafc03", "#fcad03", "#fc8403", "#fc4903", "red"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub lower: i32,
    pub upper: Option<i32>,
    pub color: &'static str,
    pub label: String,
}

/// Static depth legend, built once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub position: &'static str,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn depth() -> Self {
        let entries = LEGEND_INTERVALS
            .iter()
            .zip(LEGEND_COLORS)
            .enumerate()
            .map(|(i, (&lower, color))| {
                let upper = LEGEND_INTERVALS.get(i + 1).copied();
                let label = match upper {
                    Some(upper) => format!("{lower}km to {upper}km"),
                    None => format!("{lower}+"),
                };
                LegendEntry {
                    lower,
                    upper,
                    color,
                    label,
                }
            })
            .collect();

        Self {
            position: LEGEND_POSITION,
            entries,
        }
    }

    /// Inner HTML of the legend box: one colored swatch per interval.
    pub fn to_html(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let line_break = if entry.upper.is_some() { "<br>" } else { "" };
                format!(
                    "<i style='background-color: {}'>{}{}</i>",
                    entry.color, entry.label, line_break
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::color_for_depth;

    #[test]
    fn six_entries_in_fixed_order() {
        let legend = Legend::depth();
        let labels: Vec<_> = legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "-10km to 10km",
                "10km to 30km",
                "30km to 50km",
                "50km to 70km",
                "70km to 90km",
                "90+"
            ]
        );
        assert!(legend.entries.last().unwrap().label.ends_with('+'));
        assert_eq!(legend.position, "bottomright");
    }

    #[test]
    fn swatches_match_marker_colors() {
        for entry in Legend::depth().entries {
            let inside = match entry.upper {
                Some(upper) => (entry.lower + upper) as f64 / 2.0,
                None => entry.lower as f64 + 5.0,
            };
            assert_eq!(entry.color, color_for_depth(inside), "{}", entry.label);
        }
    }

    #[test]
    fn html_matches_legend_markup() {
        let html = Legend::depth().to_html();
        assert!(html.starts_with("<i style='background-color: green'>-10km to 10km<br></i>"));
        assert!(html.ends_with("<i style='background-color: red'>90+</i>"));
        assert_eq!(html.matches("<i ").count(), 6);
    }
}
