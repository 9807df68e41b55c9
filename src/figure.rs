//! A small plotly.js figure model.
//!
//! Only the trace and layout attributes the streamflow charts use are modelled.
//! Figures serialise to the JSON plotly.js expects, so they can be handed to
//! `Plotly.newPlot` directly or embedded with [`Figure::to_html_div`].

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Values along one axis of a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Values {
    Time(Vec<NaiveDateTime>),
    Number(Vec<f64>),
    Label(Vec<String>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Time(v) => v.len(),
            Values::Number(v) => v.len(),
            Values::Label(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<NaiveDateTime>> for Values {
    fn from(v: Vec<NaiveDateTime>) -> Self {
        Values::Time(v)
    }
}

impl From<Vec<f64>> for Values {
    fn from(v: Vec<f64>) -> Self {
        Values::Number(v)
    }
}

impl From<Vec<String>> for Values {
    fn from(v: Vec<String>) -> Self {
        Values::Label(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visible {
    Shown,
    /// Drawn only after the legend entry is clicked.
    LegendOnly,
}

impl Serialize for Visible {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Visible::Shown => s.serialize_bool(true),
            Visible::LegendOnly => s.serialize_str("legendonly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// One line trace. Missing y values serialise as `null` and show as gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter {
    #[serde(rename = "type")]
    kind: &'static str,
    pub name: String,
    pub x: Values,
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<Visible>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legendgroup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

impl Scatter {
    pub fn new(name: impl Into<String>, x: impl Into<Values>, y: Vec<f64>) -> Self {
        Self::with_gaps(name, x, y.into_iter().map(Some).collect())
    }

    pub fn with_gaps(name: impl Into<String>, x: impl Into<Values>, y: Vec<Option<f64>>) -> Self {
        Self {
            kind: "scatter",
            name: name.into(),
            x: x.into(),
            y,
            fill: None,
            visible: None,
            legendgroup: None,
            showlegend: None,
            line: None,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.line.get_or_insert_with(Line::default).color = Some(color.into());
        self
    }

    pub fn dash(mut self, dash: impl Into<String>) -> Self {
        self.line.get_or_insert_with(Line::default).dash = Some(dash.into());
        self
    }

    pub fn line_width(mut self, width: f64) -> Self {
        self.line.get_or_insert_with(Line::default).width = Some(width);
        self
    }

    /// Close the trace into a filled polygon.
    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn visible(mut self, visible: Visible) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn legend_group(mut self, group: impl Into<String>) -> Self {
        self.legendgroup = Some(group.into());
        self
    }

    pub fn hide_legend(mut self) -> Self {
        self.showlegend = Some(false);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Explicit axis extent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Range {
    Time(NaiveDateTime, NaiveDateTime),
    Number(f64, f64),
    Label(String, String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    /// `"tozero"` keeps zero on a streamflow axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangemode: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverformat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickformat: Option<String>,
}

impl Axis {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(Title::new(title)),
            ..Self::default()
        }
    }

    pub fn range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn from_zero(mut self) -> Self {
        self.rangemode = Some("tozero".into());
        self
    }

    pub fn category(mut self) -> Self {
        self.kind = Some("category".into());
        self
    }

    pub fn hover_format(mut self, fmt: impl Into<String>) -> Self {
        self.hoverformat = Some(fmt.into());
        self
    }

    pub fn tick_format(mut self, fmt: impl Into<String>) -> Self {
        self.tickformat = Some(fmt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
}

impl Layout {
    pub fn new(title: impl Into<String>, xaxis: Axis, yaxis: Axis) -> Self {
        Self {
            title: Title::new(title),
            xaxis,
            yaxis,
            legend: None,
        }
    }

    pub fn legend_title(mut self, title: impl Into<String>) -> Self {
        self.legend = Some(Legend {
            title: Title::new(title),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Scatter>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(data: Vec<Scatter>, layout: Layout) -> Self {
        Self { data, layout }
    }

    pub fn push(&mut self, trace: Scatter) {
        self.data.push(trace);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Embeddable `<div>` plus the script that draws the figure into it.
    ///
    /// plotly.js itself is not included; the page must load it.
    pub fn to_html_div(&self, div_id: &str) -> Result<String> {
        if div_id.is_empty()
            || !div_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidRequest(format!("invalid html id: {div_id:?}")));
        }
        let data = script_safe(serde_json::to_string(&self.data)?);
        let layout = script_safe(serde_json::to_string(&self.layout)?);

        Ok(format!(
            "<div id=\"{div_id}\" class=\"plotly-graph-div\" style=\"height:100%; width:100%;\"></div>\n\
             <script type=\"text/javascript\">\
             if (document.getElementById(\"{div_id}\")) {{\
             Plotly.newPlot(\"{div_id}\", {data}, {layout}, {{\"autosizable\": true, \"responsive\": true}});\
             }}</script>"
        ))
    }
}

/// Keep a JSON literal from closing the surrounding `<script>` element.
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}
