//! Template composition: dependency resolution and compiled units.
//!
//! Loading a template set runs three stages per exported template:
//!
//! 1. Directive parsing (`tessera-directive`): strip `{{extend}}` and
//!    `{{include}}` statements from the body and collect the names.
//! 2. Resolution ([`Resolver`]): fold the transitive graph into one
//!    duplicate-free [`Composition`], ancestors first, then the template,
//!    then its includes.
//! 3. Assembly ([`assemble`]): feed the composition to a [`Unit`], the first
//!    entry as root, the rest as named definitions. Blocks of later entries
//!    override blocks of earlier ones.
//!
//! ## Example
//!
//! For these sources:
//!
//! ```text
//! base        {% include "greeting" %} {% block message %}{% endblock %}
//! greeting    {{ Greeting }}!
//! Smolbotbot  {{extend "base"}}{{include "greeting"}}
//!             {% block message %}The small robot of the day is {{ Robot }}.{% endblock %}
//! ```
//!
//! `Smolbotbot` composes to `[base, Smolbotbot, greeting]`. Rendering it
//! renders the layout of `base`, with `greeting` included by name and the
//! `message` block supplied by `Smolbotbot`.

mod resolve;
mod unit;

pub use resolve::{Composition, Record, Resolver};
pub use unit::{assemble, HtmlUnit, Settings, TextUnit, Unit};
