//! Minimal SVG document writer.

use std::fmt::{self, Write};

/// An RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Horizontal alignment of text relative to its anchor point.
#[derive(Clone, Copy, Debug)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Text styling for [`Svg::text`].
#[derive(Clone, Copy, Debug)]
pub struct TextStyle<'a> {
    pub size: f64,
    pub fill: Rgb,
    pub anchor: Anchor,
    pub class: Option<&'a str>,
}

impl Default for TextStyle<'_> {
    fn default() -> Self {
        Self {
            size: 12.0,
            fill: Rgb(0, 0, 0),
            anchor: Anchor::Start,
            class: None,
        }
    }
}

#[derive(Debug)]
pub struct Svg {
    out: String,
}

impl Svg {
    pub fn new(width: f64, height: f64, style: &str) -> Result<Self, fmt::Error> {
        let mut out = String::new();
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"#
        )?;
        writeln!(out, "<style>{style}</style>")?;
        Ok(Self { out })
    }

    pub fn text(&mut self, x: f64, y: f64, style: TextStyle<'_>, content: &str) -> fmt::Result {
        write!(
            self.out,
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{:.0}" fill="{}" text-anchor="{}" dominant-baseline="middle""#,
            style.size,
            style.fill,
            style.anchor.as_str(),
        )?;
        if let Some(class) = style.class {
            write!(self.out, r#" class="{class}""#)?;
        }
        writeln!(self.out, ">{}</text>", Escaped(content))
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, stroke: Rgb, fill: Rgb) -> fmt::Result {
        writeln!(
            self.out,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{width:.2}" height="{height:.2}" stroke="{stroke}" fill="{fill}"/>"#
        )
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), stroke: Rgb) -> fmt::Result {
        writeln!(
            self.out,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{stroke}" stroke-width="0.5"/>"#,
            from.0, from.1, to.0, to.1
        )
    }

    pub fn polyline(
        &mut self,
        points: impl IntoIterator<Item = (f64, f64)>,
        stroke: Rgb,
        title: &str,
    ) -> fmt::Result {
        self.out.push_str(r#"<polyline points=""#);
        for (i, (x, y)) in points.into_iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }
            write!(self.out, "{x:.2},{y:.2}")?;
        }
        writeln!(
            self.out,
            r#"" fill="none" stroke="{stroke}" stroke-width="1"><title>{}</title></polyline>"#,
            Escaped(title)
        )
    }

    pub fn finish(mut self) -> String {
        self.out.push_str("</svg>\n");
        self.out
    }
}

/// Escapes XML special characters.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}
