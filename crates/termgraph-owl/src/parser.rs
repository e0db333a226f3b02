//! OWL functional-syntax parser (terminology fragment).

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, value},
    multi::{many0, many1},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::{
    AxiomRepresentation, OwlAxiom, OwlError, OwlGroups, OwlRelationship, OwlValue, PropertyAxiom,
    ValueType, ROLE_GROUP,
};

/// Parsed class expression, before flattening into groups.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassExpr {
    Named(u64),
    Intersection(Vec<ClassExpr>),
    Some { property: u64, filler: Box<ClassExpr> },
    DataHasValue { property: u64, value: OwlValue },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RawAxiom {
    SubClassOf(ClassExpr, ClassExpr),
    EquivalentClasses(ClassExpr, ClassExpr),
    Property(PropertyAxiom),
}

/// Cheap check used to decide whether an unparseable expression must be
/// reported (class axiom) or may be parked as a property-side record.
pub fn is_class_axiom(owl: &str) -> bool {
    let s = owl.trim_start();
    s.starts_with("SubClassOf") || s.starts_with("EquivalentClasses")
}

/// Parse a single axiom.
pub fn parse_axiom(owl: &str) -> Result<OwlAxiom, OwlError> {
    let syntax = |message: String| OwlError::Syntax {
        expression: owl.to_string(),
        message,
    };

    let raw = match all_consuming(delimited(skip_prefixes, axiom, multispace0))(owl) {
        Ok((_, raw)) => raw,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let at: String = e.input.chars().take(40).collect();
            return Err(syntax(format!("unexpected input near `{at}`")));
        }
        Err(nom::Err::Incomplete(_)) => return Err(syntax("incomplete input".to_string())),
    };

    match raw {
        RawAxiom::Property(p) => Ok(OwlAxiom::Property(p)),
        RawAxiom::SubClassOf(lhs, rhs) => class_axiom(owl, true, lhs, rhs).map(OwlAxiom::Class),
        RawAxiom::EquivalentClasses(lhs, rhs) => {
            class_axiom(owl, false, lhs, rhs).map(OwlAxiom::Class)
        }
    }
}

fn class_axiom(
    owl: &str,
    primitive: bool,
    lhs: ClassExpr,
    rhs: ClassExpr,
) -> Result<AxiomRepresentation, OwlError> {
    match (lhs, rhs) {
        (ClassExpr::Named(concept), rhs) => {
            let groups = flatten(owl, &rhs)?;
            Ok(AxiomRepresentation::named(concept, primitive, groups))
        }
        (lhs, ClassExpr::Named(concept)) => {
            let groups = flatten(owl, &lhs)?;
            let mut rep = AxiomRepresentation::gci(concept, groups);
            rep.primitive = primitive;
            Ok(rep)
        }
        _ => Err(OwlError::Unsupported {
            expression: owl.to_string(),
            message: "neither side of the axiom is a named concept".to_string(),
        }),
    }
}

/// Flatten a class expression into numbered groups.
fn flatten(owl: &str, expr: &ClassExpr) -> Result<OwlGroups, OwlError> {
    let unsupported = |message: &str| OwlError::Unsupported {
        expression: owl.to_string(),
        message: message.to_string(),
    };

    let terms: &[ClassExpr] = match expr {
        ClassExpr::Intersection(items) => items,
        other => std::slice::from_ref(other),
    };

    let mut groups = OwlGroups::new();
    let mut next_group = 1u32;
    for term in terms {
        match term {
            ClassExpr::Named(parent) => groups
                .entry(0)
                .or_default()
                .push(OwlRelationship::is_a(*parent)),
            ClassExpr::Some { property, filler } if *property == ROLE_GROUP => {
                let members = group_members(filler).ok_or_else(|| {
                    unsupported("role group must contain attribute restrictions only")
                })?;
                groups.insert(next_group, members);
                next_group += 1;
            }
            other => {
                let rel = attribute(other)
                    .ok_or_else(|| unsupported("nested class expression is not supported"))?;
                groups.entry(0).or_default().push(rel);
            }
        }
    }
    Ok(groups)
}

fn group_members(filler: &ClassExpr) -> Option<Vec<OwlRelationship>> {
    match filler {
        ClassExpr::Intersection(items) => items.iter().map(attribute).collect(),
        other => attribute(other).map(|r| vec![r]),
    }
}

fn attribute(expr: &ClassExpr) -> Option<OwlRelationship> {
    match expr {
        ClassExpr::Some { property, filler } => match filler.as_ref() {
            ClassExpr::Named(target) if *property != ROLE_GROUP => {
                Some(OwlRelationship::concept(*property, *target))
            }
            _ => None,
        },
        ClassExpr::DataHasValue { property, value } => {
            Some(OwlRelationship::value(*property, value.clone()))
        }
        _ => None,
    }
}

// ============================================================================
// Grammar
// ============================================================================

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// `Prefix(:=<http://snomed.info/id/>)` declarations are accepted and ignored.
fn skip_prefixes(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(ws(tuple((tag("Prefix"), ws(char('(')), is_not(")"), char(')'))))),
    )(input)
}

fn sctid(input: &str) -> IResult<&str, u64> {
    alt((
        preceded(char(':'), map_res(digit1, |s: &str| s.parse::<u64>())),
        delimited(
            tag("<http://snomed.info/id/"),
            map_res(digit1, |s: &str| s.parse::<u64>()),
            char('>'),
        ),
    ))(input)
}

fn open(input: &str) -> IResult<&str, char> {
    ws(char('('))(input)
}

fn close(input: &str) -> IResult<&str, char> {
    ws(char(')'))(input)
}

fn axiom(input: &str) -> IResult<&str, RawAxiom> {
    ws(alt((
        map(
            preceded(tag("SubClassOf"), delimited(open, tuple((class_expr, class_expr)), close)),
            |(l, r)| RawAxiom::SubClassOf(l, r),
        ),
        map(
            preceded(
                tag("EquivalentClasses"),
                delimited(open, tuple((class_expr, class_expr)), close),
            ),
            |(l, r)| RawAxiom::EquivalentClasses(l, r),
        ),
        map(property_axiom, RawAxiom::Property),
    )))(input)
}

fn property_axiom(input: &str) -> IResult<&str, PropertyAxiom> {
    alt((
        map(
            preceded(
                tag("SubObjectPropertyOf"),
                delimited(
                    open,
                    tuple((
                        ws(preceded(
                            tag("ObjectPropertyChain"),
                            delimited(open, many1(ws(sctid)), close),
                        )),
                        ws(sctid),
                    )),
                    close,
                ),
            ),
            |(chain, sup)| PropertyAxiom::PropertyChain { chain, sup },
        ),
        map(
            preceded(
                tag("SubObjectPropertyOf"),
                delimited(open, tuple((ws(sctid), ws(sctid))), close),
            ),
            |(sub, sup)| PropertyAxiom::SubObjectPropertyOf { sub, sup },
        ),
        map(
            preceded(
                tag("SubDataPropertyOf"),
                delimited(open, tuple((ws(sctid), ws(sctid))), close),
            ),
            |(sub, sup)| PropertyAxiom::SubDataPropertyOf { sub, sup },
        ),
        map(
            preceded(tag("TransitiveObjectProperty"), delimited(open, ws(sctid), close)),
            PropertyAxiom::TransitiveObjectProperty,
        ),
        map(
            preceded(tag("ReflexiveObjectProperty"), delimited(open, ws(sctid), close)),
            PropertyAxiom::ReflexiveObjectProperty,
        ),
    ))(input)
}

fn class_expr(input: &str) -> IResult<&str, ClassExpr> {
    ws(alt((
        map(
            preceded(tag("ObjectIntersectionOf"), delimited(open, many1(class_expr), close)),
            ClassExpr::Intersection,
        ),
        map(
            preceded(
                tag("ObjectSomeValuesFrom"),
                delimited(open, tuple((ws(sctid), class_expr)), close),
            ),
            |(property, filler)| ClassExpr::Some {
                property,
                filler: Box::new(filler),
            },
        ),
        map(
            preceded(
                tag("DataHasValue"),
                delimited(open, tuple((ws(sctid), ws(literal))), close),
            ),
            |(property, value)| ClassExpr::DataHasValue { property, value },
        ),
        map(sctid, ClassExpr::Named),
    )))(input)
}

fn datatype(input: &str) -> IResult<&str, ValueType> {
    alt((
        value(ValueType::Decimal, tag("xsd:decimal")),
        value(ValueType::Integer, tag("xsd:integer")),
        value(ValueType::String, tag("xsd:string")),
        value(
            ValueType::Decimal,
            tag("<http://www.w3.org/2001/XMLSchema#decimal>"),
        ),
        value(
            ValueType::Integer,
            tag("<http://www.w3.org/2001/XMLSchema#integer>"),
        ),
        value(
            ValueType::String,
            tag("<http://www.w3.org/2001/XMLSchema#string>"),
        ),
    ))(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            char('"'),
        ),
        Option::unwrap_or_default,
    )(input)
}

fn literal(input: &str) -> IResult<&str, OwlValue> {
    map_res(
        tuple((quoted, opt(preceded(tag("^^"), datatype)))),
        |(lexical, value_type)| {
            OwlValue::from_lexical(value_type.unwrap_or(ValueType::String), &lexical)
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OwlTarget, IS_A};

    #[test]
    fn single_parent_axiom() {
        let rep = match parse_axiom("SubClassOf(:100005 :200009)").unwrap() {
            OwlAxiom::Class(rep) => rep,
            other => panic!("expected class axiom, got {other:?}"),
        };
        assert!(rep.primitive);
        assert_eq!(rep.left_hand_concept, Some(100005));
        assert_eq!(
            rep.relationships_by_group().get(&0),
            Some(&vec![OwlRelationship::is_a(200009)])
        );
    }

    #[test]
    fn grouped_attributes_are_numbered_in_order() {
        let owl = "EquivalentClasses(:100005 ObjectIntersectionOf(:200009 \
                   ObjectSomeValuesFrom(:609096000 ObjectIntersectionOf(\
                   ObjectSomeValuesFrom(:363698007 :39057004) \
                   ObjectSomeValuesFrom(:116676008 :415582006))) \
                   ObjectSomeValuesFrom(:609096000 ObjectSomeValuesFrom(:363698007 :300001)) \
                   ObjectSomeValuesFrom(:272741003 :7771000)))";
        let rep = match parse_axiom(owl).unwrap() {
            OwlAxiom::Class(rep) => rep,
            other => panic!("expected class axiom, got {other:?}"),
        };
        assert!(!rep.primitive);
        let groups = rep.relationships_by_group();
        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups[&0],
            vec![
                OwlRelationship::is_a(200009),
                OwlRelationship::concept(272741003, 7771000)
            ]
        );
        assert_eq!(groups[&1].len(), 2);
        assert_eq!(groups[&2], vec![OwlRelationship::concept(363698007, 300001)]);
    }

    #[test]
    fn concrete_values_and_full_iris() {
        let owl = "SubClassOf(<http://snomed.info/id/100005> ObjectIntersectionOf(\
                   <http://snomed.info/id/200009> \
                   ObjectSomeValuesFrom(:609096000 ObjectIntersectionOf(\
                   DataHasValue(:3264475007 \"1.5\"^^xsd:decimal) \
                   DataHasValue(:1142139005 \"2\"^^xsd:integer) \
                   DataHasValue(:1142140007 \"tablet \\\"coated\\\"\"^^xsd:string)))))";
        let rep = match parse_axiom(owl).unwrap() {
            OwlAxiom::Class(rep) => rep,
            other => panic!("expected class axiom, got {other:?}"),
        };
        let group = &rep.relationships_by_group()[&1];
        assert_eq!(
            group[0].target,
            OwlTarget::Value(OwlValue::Decimal("1.5".to_string()))
        );
        assert_eq!(group[1].target, OwlTarget::Value(OwlValue::Integer(2)));
        assert_eq!(
            group[2].target,
            OwlTarget::Value(OwlValue::String("tablet \"coated\"".to_string()))
        );
    }

    #[test]
    fn gci_has_named_concept_on_the_right() {
        let owl = "SubClassOf(ObjectIntersectionOf(:200009 \
                   ObjectSomeValuesFrom(:609096000 ObjectSomeValuesFrom(:363698007 :39057004))) :100005)";
        let rep = match parse_axiom(owl).unwrap() {
            OwlAxiom::Class(rep) => rep,
            other => panic!("expected class axiom, got {other:?}"),
        };
        assert!(rep.is_gci());
        assert_eq!(rep.right_hand_concept, Some(100005));
        assert_eq!(rep.relationships_by_group()[&0][0].type_id, IS_A);
    }

    #[test]
    fn property_axioms() {
        assert_eq!(
            parse_axiom("TransitiveObjectProperty(:774081006)").unwrap(),
            OwlAxiom::Property(PropertyAxiom::TransitiveObjectProperty(774081006))
        );
        assert_eq!(
            parse_axiom("SubObjectPropertyOf(ObjectPropertyChain(:246093002 :738774007) :246093002)")
                .unwrap(),
            OwlAxiom::Property(PropertyAxiom::PropertyChain {
                chain: vec![246093002, 738774007],
                sup: 246093002
            })
        );
        assert_eq!(
            parse_axiom("SubObjectPropertyOf(:363698007 :762705008)").unwrap(),
            OwlAxiom::Property(PropertyAxiom::SubObjectPropertyOf {
                sub: 363698007,
                sup: 762705008
            })
        );
    }

    #[test]
    fn prefix_declarations_are_ignored() {
        let owl = "Prefix(:=<http://snomed.info/id/>) SubClassOf(:100005 :200009)";
        assert!(matches!(parse_axiom(owl), Ok(OwlAxiom::Class(_))));
    }

    #[test]
    fn malformed_expressions_are_syntax_errors() {
        assert!(matches!(
            parse_axiom("SubClassOf(:100005"),
            Err(OwlError::Syntax { .. })
        ));
        assert!(is_class_axiom("SubClassOf(:100005"));
        assert!(!is_class_axiom("DisjointClasses(:1 :2)"));
    }

    #[test]
    fn nested_restrictions_are_unsupported() {
        let owl = "SubClassOf(:100005 ObjectSomeValuesFrom(:363698007 \
                   ObjectSomeValuesFrom(:116676008 :415582006)))";
        assert!(matches!(
            parse_axiom(owl),
            Err(OwlError::Unsupported { .. })
        ));
    }
}
