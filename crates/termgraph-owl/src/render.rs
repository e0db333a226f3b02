//! Rendering grouped relationships back into OWL functional syntax.
//!
//! Output is canonical: IS-A parents first (ascending), then ungrouped
//! attributes, then role groups in group order, each sorted. Parsing the
//! output yields the same relationships with groups renumbered `1..n`.

use crate::{AxiomRepresentation, OwlError, OwlGroups, OwlRelationship, OwlTarget, OwlValue, IS_A, ROLE_GROUP};

pub fn render_class_axiom(rep: &AxiomRepresentation) -> Result<String, OwlError> {
    let concept = rep.named_concept().ok_or_else(|| OwlError::Unsupported {
        expression: String::new(),
        message: "axiom has no named concept".to_string(),
    })?;
    let terms = render_terms(rep.relationships_by_group());
    if terms.is_empty() {
        return Err(OwlError::Empty { concept });
    }
    let body = if terms.len() == 1 {
        terms.into_iter().next().unwrap_or_default()
    } else {
        format!("ObjectIntersectionOf({})", terms.join(" "))
    };

    let keyword = if rep.primitive {
        "SubClassOf"
    } else {
        "EquivalentClasses"
    };
    Ok(if rep.is_gci() {
        format!("{keyword}({body} {})", entity(concept))
    } else {
        format!("{keyword}({} {body})", entity(concept))
    })
}

fn render_terms(groups: &OwlGroups) -> Vec<String> {
    let mut terms = Vec::new();

    if let Some(ungrouped) = groups.get(&0) {
        let mut parents: Vec<u64> = ungrouped
            .iter()
            .filter(|r| r.type_id == IS_A)
            .filter_map(|r| match r.target {
                OwlTarget::Concept(id) => Some(id),
                OwlTarget::Value(_) => None,
            })
            .collect();
        parents.sort_unstable();
        parents.dedup();
        terms.extend(parents.into_iter().map(entity));

        let mut attributes: Vec<&OwlRelationship> =
            ungrouped.iter().filter(|r| r.type_id != IS_A).collect();
        attributes.sort();
        terms.extend(attributes.into_iter().map(render_attribute));
    }

    for (_, members) in groups.range(1..) {
        if members.is_empty() {
            continue;
        }
        let mut members: Vec<&OwlRelationship> = members.iter().collect();
        members.sort();
        let inner = if members.len() == 1 {
            render_attribute(members[0])
        } else {
            let parts: Vec<String> = members.into_iter().map(render_attribute).collect();
            format!("ObjectIntersectionOf({})", parts.join(" "))
        };
        terms.push(format!(
            "ObjectSomeValuesFrom({} {inner})",
            entity(ROLE_GROUP)
        ));
    }

    terms
}

fn render_attribute(rel: &OwlRelationship) -> String {
    match &rel.target {
        OwlTarget::Concept(target) => format!(
            "ObjectSomeValuesFrom({} {})",
            entity(rel.type_id),
            entity(*target)
        ),
        OwlTarget::Value(value) => {
            format!("DataHasValue({} {})", entity(rel.type_id), literal(value))
        }
    }
}

fn literal(value: &OwlValue) -> String {
    let escaped = value.lexical().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"^^{}", value.value_type().xsd_name())
}

fn entity(id: u64) -> String {
    format!(":{id}")
}
