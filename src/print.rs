// ============================================================================
// Rendering
// ============================================================================
//
// Atoms render their raw value; lists render "(" + each child followed by a
// single space + ")". A list's children are snapshotted and its lock dropped
// before descending, so rendering never holds one node while waiting on
// another.
//
// ============================================================================

use crate::core::Result;
use crate::element::Element;

/// Render `element` and everything below it.
///
/// Blocks at any node owned by another thread's transaction until that
/// transaction commits or rolls back.
pub fn print(element: &Element) -> Result<String> {
    let mut out = String::new();
    write_element(element, &mut out)?;
    Ok(out)
}

fn write_element(element: &Element, out: &mut String) -> Result<()> {
    match element {
        Element::Atom(atom) => out.push_str(&atom.value()?),
        Element::List(list) => {
            out.push('(');
            for child in list.children()? {
                write_element(&child, out)?;
                out.push(' ');
            }
            out.push(')');
        }
    }
    Ok(())
}
