//! Compiled template units.
//!
//! A unit is the executable result of one composition order. The first entry
//! becomes the root; every later entry is added as a named definition. Each
//! definition is available two ways:
//!
//! - by name, so any template of the unit can `{% include "name" %}` it;
//! - as the next link of an inheritance chain starting at the root, so its
//!   `{% block %}`s override the blocks of every entry before it.
//!
//! Executing a unit renders the last link of that chain. The root's layout
//! is what gets written, with each block taken from the latest entry that
//! defines it. As with any Jinja child template, text a later entry writes
//! outside of its blocks is not part of the chained output; it is only
//! reachable by including the entry by name.
//!
//! The [`Unit`] trait is the seam between the resolver and the rendering
//! engine. Two minijinja-backed variants are provided:
//!
//! - [`HtmlUnit`]: output of every expression is HTML-escaped.
//! - [`TextUnit`]: output is written as-is.

use std::io::Write;

use minijinja::{AutoEscape, Environment, Error, UndefinedBehavior};

use super::resolve::Composition;
use crate::builder::DataMap;
use crate::error;
use crate::functions::Functions;

/// Compile-time settings shared by every unit of one cache.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Functions bound into the root of each unit.
    pub functions: Functions,
    /// Fail rendering on undefined variables instead of printing nothing.
    pub strict_undefined: bool,
}

/// A compiled, executable template.
pub trait Unit: Send + Sync + Sized + 'static {
    /// Creates a unit whose root template is `name`.
    ///
    /// Functions from `settings` are bound here and inherited by every later
    /// definition.
    fn create_root(name: &str, content: &str, settings: &Settings) -> Result<Self, Error>;

    /// Adds a named definition to the unit.
    fn add_definition(&mut self, name: &str, content: &str) -> Result<(), Error>;

    /// Name of the root template.
    fn root(&self) -> &str;

    /// Renders the unit against `data`, writing to `sink`.
    ///
    /// The root's layout is rendered with every block taken from the latest
    /// definition that overrides it.
    fn execute(&self, data: &DataMap, sink: &mut dyn Write) -> Result<(), Error>;
}

/// Builds one unit from a composition order.
///
/// Any parse failure aborts assembly and is reported with the name of the
/// offending template.
pub fn assemble<U: Unit>(composition: &Composition<'_>, settings: &Settings) -> error::Result<U> {
    let syntax = |name: &str| {
        let name = name.to_string();
        move |source: Error| error::Error::Syntax { name, source }
    };

    let (root, body) = composition.root();
    let mut unit = U::create_root(root, body, settings).map_err(syntax(root))?;
    for &(name, body) in composition.definitions() {
        unit.add_definition(name, body).map_err(syntax(name))?;
    }
    Ok(unit)
}

/// Shared minijinja plumbing of both unit flavors.
#[derive(Debug)]
struct Compiled {
    env: Environment<'static>,
    root: String,
    /// Last link of the inheritance chain; this is what gets rendered.
    entry: String,
}

impl Compiled {
    fn new(
        name: &str,
        content: &str,
        settings: &Settings,
        escape: fn(&str) -> AutoEscape,
    ) -> Result<Self, Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(escape);
        if settings.strict_undefined {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        }
        settings.functions.bind(&mut env);

        env.add_template_owned(name.to_string(), content.to_string())?;
        Ok(Self {
            env,
            root: name.to_string(),
            entry: name.to_string(),
        })
    }

    fn add_definition(&mut self, name: &str, content: &str) -> Result<(), Error> {
        self.env
            .add_template_owned(name.to_string(), content.to_string())?;

        let link = link_name(name);
        let chained = format!("{{% extends {:?} %}}{}", self.entry, content);
        self.env.add_template_owned(link.clone(), chained)?;
        self.entry = link;
        Ok(())
    }

    fn execute(&self, data: &DataMap, sink: &mut dyn Write) -> Result<(), Error> {
        let template = self.env.get_template(&self.entry)?;
        template.render_captured_to(data, sink)?;
        Ok(())
    }
}

/// Name under which a definition is registered as an inheritance link.
fn link_name(name: &str) -> String {
    format!("{name} [composed]")
}

fn escape_html(_name: &str) -> AutoEscape {
    AutoEscape::Html
}

fn escape_none(_name: &str) -> AutoEscape {
    AutoEscape::None
}

/// Unit that HTML-escapes every expression it outputs.
#[derive(Debug)]
pub struct HtmlUnit(Compiled);

impl Unit for HtmlUnit {
    fn create_root(name: &str, content: &str, settings: &Settings) -> Result<Self, Error> {
        Compiled::new(name, content, settings, escape_html).map(HtmlUnit)
    }

    fn add_definition(&mut self, name: &str, content: &str) -> Result<(), Error> {
        self.0.add_definition(name, content)
    }

    fn root(&self) -> &str {
        &self.0.root
    }

    fn execute(&self, data: &DataMap, sink: &mut dyn Write) -> Result<(), Error> {
        self.0.execute(data, sink)
    }
}

/// Unit that writes expression output unescaped.
#[derive(Debug)]
pub struct TextUnit(Compiled);

impl Unit for TextUnit {
    fn create_root(name: &str, content: &str, settings: &Settings) -> Result<Self, Error> {
        Compiled::new(name, content, settings, escape_none).map(TextUnit)
    }

    fn add_definition(&mut self, name: &str, content: &str) -> Result<(), Error> {
        self.0.add_definition(name, content)
    }

    fn root(&self) -> &str {
        &self.0.root
    }

    fn execute(&self, data: &DataMap, sink: &mut dyn Write) -> Result<(), Error> {
        self.0.execute(data, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::Value;

    fn data(pairs: &[(&str, &str)]) -> DataMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn run<U: Unit>(unit: &U, data: &DataMap) -> String {
        let mut out = Vec::new();
        unit.execute(data, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_root_includes_definitions() {
        let mut unit = TextUnit::create_root(
            "base",
            "<{% include \"body\" %}>",
            &Settings::default(),
        )
        .unwrap();
        unit.add_definition("body", "{{ name }}").unwrap();

        assert_eq!(unit.root(), "base");
        assert_eq!(run(&unit, &data(&[("name", "x")])), "<x>");
    }

    #[test]
    fn test_html_unit_escapes() {
        let unit =
            HtmlUnit::create_root("page", "<p>{{ v }}</p>", &Settings::default()).unwrap();
        let out = run(&unit, &data(&[("v", "<b>")]));
        assert_eq!(out, "<p>&lt;b&gt;</p>");
    }

    #[test]
    fn test_text_unit_does_not_escape() {
        let unit =
            TextUnit::create_root("page.html", "<p>{{ v }}</p>", &Settings::default()).unwrap();
        assert_eq!(run(&unit, &data(&[("v", "<b>")])), "<p><b></p>");
    }

    #[test]
    fn test_functions_inherited_by_definitions() {
        let settings = Settings {
            functions: Functions::std(),
            strict_undefined: false,
        };
        let mut unit =
            TextUnit::create_root("root", "{% include \"part\" %}", &settings).unwrap();
        unit.add_definition("part", "{{ mul(6, 7) }}").unwrap();
        assert_eq!(run(&unit, &DataMap::new()), "42");
    }

    #[test]
    fn test_strict_undefined() {
        let lenient = TextUnit::create_root("t", "[{{ missing }}]", &Settings::default()).unwrap();
        assert_eq!(run(&lenient, &DataMap::new()), "[]");

        let settings = Settings {
            strict_undefined: true,
            ..Settings::default()
        };
        let strict = TextUnit::create_root("t", "[{{ missing }}]", &settings).unwrap();
        let mut out = Vec::new();
        assert!(strict.execute(&DataMap::new(), &mut out).is_err());
    }

    #[test]
    fn test_syntax_error_on_create() {
        assert!(TextUnit::create_root("bad", "{{ unclosed", &Settings::default()).is_err());
    }

    #[test]
    fn test_definition_blocks_override_root() {
        let mut unit = TextUnit::create_root(
            "base",
            "<{% block title %}untitled{% endblock %}|{% block body %}{% endblock %}>",
            &Settings::default(),
        )
        .unwrap();
        unit.add_definition("Page", "ignored {% block body %}{{ name }}{% endblock %}")
            .unwrap();

        assert_eq!(unit.root(), "base");
        assert_eq!(run(&unit, &data(&[("name", "x")])), "<untitled|x>");
    }

    #[test]
    fn test_later_definitions_win() {
        let mut unit =
            TextUnit::create_root("base", "{% block a %}0{% endblock %}", &Settings::default())
                .unwrap();
        unit.add_definition("one", "{% block a %}1{% endblock %}").unwrap();
        unit.add_definition("two", "{% block a %}{{ super() }}2{% endblock %}")
            .unwrap();
        assert_eq!(run(&unit, &DataMap::new()), "12");
    }

    #[test]
    fn test_definitions_stay_includable() {
        let mut unit = TextUnit::create_root(
            "base",
            "{% include \"part\" %}/{% block b %}{% endblock %}",
            &Settings::default(),
        )
        .unwrap();
        unit.add_definition("part", "P{% block b %}B{% endblock %}").unwrap();
        assert_eq!(run(&unit, &DataMap::new()), "PB/B");
    }

    #[test]
    fn test_html_blocks_escape() {
        let mut unit = HtmlUnit::create_root(
            "layout",
            "<p>{% block v %}{% endblock %}</p>",
            &Settings::default(),
        )
        .unwrap();
        unit.add_definition("Page", "{% block v %}{{ v }}{% endblock %}").unwrap();
        assert_eq!(run(&unit, &data(&[("v", "<b>")])), "<p>&lt;b&gt;</p>");
    }

    #[test]
    fn test_syntax_error_in_definition() {
        let mut unit = TextUnit::create_root("base", "ok", &Settings::default()).unwrap();
        assert!(unit.add_definition("bad", "{% block %}").is_err());
    }
}
