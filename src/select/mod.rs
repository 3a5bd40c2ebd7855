//! Interactive endpoint selection
//!
//! Presents the catalog and returns exactly one chosen endpoint. There is
//! no default and no auto-select, even for a single-entry catalog - the
//! operator always confirms which task they are about to tunnel into.

use dialoguer::console::Term;
use dialoguer::Select;

use crate::catalog::Endpoint;
use crate::errors::{HoplinkError, Result};

/// Interactive-choice capability: given an ordered list of labels, return
/// the chosen index, or `None` when the user backs out.
pub trait Picker {
    fn pick(&self, prompt: &str, items: &[String]) -> Result<Option<usize>>;
}

/// Terminal picker backed by dialoguer. The menu renders on stderr so
/// stdout stays reserved for tunnel output.
pub struct InteractivePicker;

impl Picker for InteractivePicker {
    fn pick(&self, prompt: &str, items: &[String]) -> Result<Option<usize>> {
        let term = Term::stderr();
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_on_opt(&term)
            .map_err(|_| HoplinkError::SelectionAborted)
    }
}

/// Let the operator choose one endpoint out of the catalog.
///
/// A cancelled prompt (Esc, or interrupted input) surfaces as
/// [`HoplinkError::SelectionAborted`] so the caller can exit without
/// starting a tunnel.
pub fn choose<P: Picker>(picker: &P, catalog: &[Endpoint]) -> Result<Endpoint> {
    if catalog.is_empty() {
        return Err(HoplinkError::Argument(
            "the service has no exposed ports to select from".to_string(),
        ));
    }

    let labels: Vec<String> = catalog.iter().map(Endpoint::to_string).collect();
    let index = picker
        .pick("Select the task to port forward to", &labels)?
        .ok_or(HoplinkError::SelectionAborted)?;

    catalog.get(index).cloned().ok_or_else(|| {
        HoplinkError::Argument(format!(
            "selection index {} out of range for {} endpoints",
            index,
            catalog.len()
        ))
    })
}
