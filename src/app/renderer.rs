//! Chart rendering: maps a chart-type tag plus a result table to a
//! serializable chart spec the UI layer can draw. Model-authored plotting
//! expressions go through a restricted parser instead of being evaluated.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::app::models::Table;

/// The fixed chart catalog. An enum rather than a string-keyed function map
/// so dispatch stays exhaustiveness-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    // Basics
    Scatter,
    Line,
    Area,
    Bar,
    Funnel,
    Timeline,
    // Part-of-whole
    Pie,
    Sunburst,
    Treemap,
    Icicle,
    FunnelArea,
    // 1D distributions
    Histogram,
    Box,
    Violin,
    Strip,
    Ecdf,
    // 2D distributions
    DensityHeatmap,
    DensityContour,
    // Matrix input
    Imshow,
    // 3-dimensional
    Scatter3d,
    Line3d,
    // Multidimensional
    ScatterMatrix,
    ParallelCoordinates,
    ParallelCategories,
    // Tile maps
    ScatterMapbox,
    LineMapbox,
    ChoroplethMapbox,
    DensityMapbox,
    // Outline maps
    ScatterGeo,
    LineGeo,
    Choropleth,
    // Polar
    ScatterPolar,
    LinePolar,
    BarPolar,
    // Ternary
    ScatterTernary,
    LineTernary,
}

impl ChartType {
    /// Positional bindings the chart needs, in binding order.
    pub fn required_bindings(&self) -> &'static [&'static str] {
        use ChartType::*;
        match self {
            Scatter | Line | Area | Bar | Funnel | Timeline | Box | Violin | Strip
            | DensityHeatmap | DensityContour => &["x", "y"],
            Pie | FunnelArea => &["names", "values"],
            Sunburst | Treemap | Icicle => &["path", "values"],
            Histogram | Ecdf => &["x"],
            Imshow => &[],
            Scatter3d | Line3d => &["x", "y", "z"],
            ScatterMatrix | ParallelCoordinates | ParallelCategories => &["dimensions"],
            ScatterMapbox | LineMapbox | DensityMapbox | ScatterGeo | LineGeo => {
                &["lat", "lon"]
            }
            Choropleth | ChoroplethMapbox => &["locations", "color"],
            ScatterPolar | LinePolar | BarPolar => &["r", "theta"],
            ScatterTernary | LineTernary => &["a", "b", "c"],
        }
    }

    pub fn tag(&self) -> &'static str {
        use ChartType::*;
        match self {
            Scatter => "scatter",
            Line => "line",
            Area => "area",
            Bar => "bar",
            Funnel => "funnel",
            Timeline => "timeline",
            Pie => "pie",
            Sunburst => "sunburst",
            Treemap => "treemap",
            Icicle => "icicle",
            FunnelArea => "funnel_area",
            Histogram => "histogram",
            Box => "box",
            Violin => "violin",
            Strip => "strip",
            Ecdf => "ecdf",
            DensityHeatmap => "density_heatmap",
            DensityContour => "density_contour",
            Imshow => "imshow",
            Scatter3d => "scatter_3d",
            Line3d => "line_3d",
            ScatterMatrix => "scatter_matrix",
            ParallelCoordinates => "parallel_coordinates",
            ParallelCategories => "parallel_categories",
            ScatterMapbox => "scatter_mapbox",
            LineMapbox => "line_mapbox",
            ChoroplethMapbox => "choropleth_mapbox",
            DensityMapbox => "density_mapbox",
            ScatterGeo => "scatter_geo",
            LineGeo => "line_geo",
            Choropleth => "choropleth",
            ScatterPolar => "scatter_polar",
            LinePolar => "line_polar",
            BarPolar => "bar_polar",
            ScatterTernary => "scatter_ternary",
            LineTernary => "line_ternary",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ChartType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ChartType::*;
        match s.trim().to_ascii_lowercase().as_str() {
            "scatter" => Ok(Scatter),
            "line" => Ok(Line),
            "area" => Ok(Area),
            "bar" => Ok(Bar),
            "funnel" => Ok(Funnel),
            "timeline" => Ok(Timeline),
            "pie" => Ok(Pie),
            "sunburst" => Ok(Sunburst),
            "treemap" => Ok(Treemap),
            "icicle" => Ok(Icicle),
            "funnel_area" => Ok(FunnelArea),
            "histogram" => Ok(Histogram),
            "box" => Ok(Box),
            "violin" => Ok(Violin),
            "strip" => Ok(Strip),
            "ecdf" => Ok(Ecdf),
            "density_heatmap" => Ok(DensityHeatmap),
            "density_contour" => Ok(DensityContour),
            "imshow" => Ok(Imshow),
            "scatter_3d" => Ok(Scatter3d),
            "line_3d" => Ok(Line3d),
            "scatter_matrix" => Ok(ScatterMatrix),
            "parallel_coordinates" => Ok(ParallelCoordinates),
            "parallel_categories" => Ok(ParallelCategories),
            "scatter_mapbox" => Ok(ScatterMapbox),
            "line_mapbox" => Ok(LineMapbox),
            "choropleth_mapbox" => Ok(ChoroplethMapbox),
            "density_mapbox" => Ok(DensityMapbox),
            "scatter_geo" => Ok(ScatterGeo),
            "line_geo" => Ok(LineGeo),
            "choropleth" => Ok(Choropleth),
            "scatter_polar" => Ok(ScatterPolar),
            "line_polar" => Ok(LinePolar),
            "bar_polar" => Ok(BarPolar),
            "scatter_ternary" => Ok(ScatterTernary),
            "line_ternary" => Ok(LineTernary),
            _ => Err(()),
        }
    }
}

/// The renderable object handed to the UI collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub chart_type: String,
    pub bindings: Vec<(String, String)>,
}

/// Map a chart-type tag plus a result table to a chart spec. Columns bind
/// positionally in table order unless explicit bindings are supplied. An
/// unrecognized tag or a table with too few columns produces no chart and a
/// warning, never an error.
pub fn render(tag: &str, table: &Table) -> Option<ChartSpec> {
    let Ok(chart_type) = tag.parse::<ChartType>() else {
        warn!("visualization type '{}' is not recognized", tag);
        return None;
    };

    let required = chart_type.required_bindings();
    let bindings = if required == ["dimensions"] {
        vec![("dimensions".to_string(), table.columns.join(", "))]
    } else {
        if table.columns.len() < required.len() {
            warn!(
                "result table has {} columns but '{}' needs {}",
                table.columns.len(),
                chart_type,
                required.len()
            );
            return None;
        }
        required
            .iter()
            .zip(&table.columns)
            .map(|(key, column)| (key.to_string(), column.clone()))
            .collect()
    };

    Some(ChartSpec {
        chart_type: chart_type.tag().to_string(),
        bindings,
    })
}

/// A parsed model-authored plotting call: the function and its keyword
/// arguments, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotCall {
    pub chart_type: ChartType,
    pub bindings: Vec<(String, String)>,
}

// Keyword arguments allowed beyond the chart's required bindings.
const EXTRA_KEYWORDS: &[&str] = &["color", "title", "labels", "size", "hover_name"];

/// Parse a plotting expression like `px.bar(data, x="a", y="b")` into a
/// whitelisted call. This is the trust boundary for model-authored code:
/// only the `px` namespace, the `data` table alias, known chart functions
/// and plain `key="value"` keywords are accepted; everything else is
/// rejected with a reason.
pub fn parse_plot_call(expr: &str) -> Result<PlotCall, String> {
    let call_re = Regex::new(
        r#"^(?:px|plotly_express)\.([a-z0-9_]+)\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:,(.*))?\)\s*$"#,
    )
    .map_err(|e| e.to_string())?;
    let kwarg_re =
        Regex::new(r#"^\s*([a-z_][a-z0-9_]*)\s*=\s*"([^"]*)"\s*$"#).map_err(|e| e.to_string())?;

    let captures = call_re
        .captures(expr.trim())
        .ok_or_else(|| format!("not a recognizable plotting call: {}", expr.trim()))?;

    let function = &captures[1];
    let chart_type: ChartType = function
        .parse()
        .map_err(|_| format!("'{}' is not a permitted plotting function", function))?;

    let alias = &captures[2];
    if alias != "data" {
        return Err(format!(
            "first argument must be the result table alias 'data', found '{}'",
            alias
        ));
    }

    let mut bindings = Vec::new();
    if let Some(rest) = captures.get(3) {
        for part in rest.as_str().split(',') {
            if part.trim().is_empty() {
                continue;
            }
            let kw = kwarg_re
                .captures(part)
                .ok_or_else(|| format!("unsupported argument form: {}", part.trim()))?;
            let key = kw[1].to_string();
            if !chart_type.required_bindings().contains(&key.as_str())
                && !EXTRA_KEYWORDS.contains(&key.as_str())
            {
                return Err(format!(
                    "keyword '{}' is not permitted for '{}'",
                    key, chart_type
                ));
            }
            bindings.push((key, kw[2].to_string()));
        }
    }
    Ok(PlotCall {
        chart_type,
        bindings,
    })
}

/// Render a parsed plotting call against the result table. Required bindings
/// must be present and must name existing columns; anything missing skips
/// the chart with a warning.
pub fn render_call(call: &PlotCall, table: &Table) -> Option<ChartSpec> {
    for required in call.chart_type.required_bindings() {
        let Some((_, value)) = call.bindings.iter().find(|(key, _)| key == required) else {
            warn!(
                "plotting call for '{}' is missing required binding '{}'",
                call.chart_type, required
            );
            return None;
        };
        if *required != "dimensions" && !table.columns.iter().any(|c| c == value) {
            warn!(
                "plotting call binds '{}' to unknown column '{}'",
                required, value
            );
            return None;
        }
    }
    Some(ChartSpec {
        chart_type: call.chart_type.tag().to_string(),
        bindings: call.bindings.clone(),
    })
}
