//! Rendering filter terms to their canonical BSON document form.
//!
//! This is where the server's combination semantics live. Rendering a leaf
//! term streams the resolved path and encoded operands directly into a
//! [`DocumentWriter`]; rendering a combinator renders its children first and
//! then rewrites:
//!
//! * conjunctions fold clause by clause, merging disjoint operator documents
//!   on the same field and escalating to `$and` only on a genuine conflict;
//! * disjunctions flatten nested `$or` arrays into their parent;
//! * negations are lowered per operator family so that no bare `$not` is
//!   left at the top level of the output;
//! * `$elemMatch` over a scalar array has its empty-key inner clause folded
//!   into the element-match body.

use std::sync::Arc;
use bson::{ Bson, Document };
use crate::encode::{ EncoderRegistry, ValueEncoder };
use crate::error::{ Error, ErrorKind, Result, ResultExt };
use crate::filter::{ FilterNode, Operand };
use crate::schema::{ DocumentSchema, EmptySchema };
use crate::writer::DocumentWriter;

/// Renders one term to a BSON document, bottom-up.
pub(crate) fn render_node(
    node: &FilterNode,
    schema: &dyn DocumentSchema,
    registry: &EncoderRegistry,
) -> Result<Document> {
    match node {
        FilterNode::Simple { field, value } => {
            let resolved = field.resolve(schema, registry)?;
            let mut writer = DocumentWriter::new();

            writer.begin_document()?;
            writer.write_name(resolved.path.as_str())?;
            write_operand(&mut writer, value, &resolved.encoder, &resolved.path)?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::Operator { field, op, value } => {
            let resolved = field.resolve(schema, registry)?;
            let mut writer = DocumentWriter::new();

            writer.begin_document()?;
            writer.write_name(resolved.path.as_str())?;
            writer.begin_document()?;
            writer.write_name(*op)?;
            write_operand(&mut writer, value, &resolved.encoder, &resolved.path)?;
            writer.end_document()?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::ArrayOperator { field, op, items } => {
            let resolved = field.resolve(schema, registry)?;
            let item_encoder = resolved.element_encoder()?;
            let mut writer = DocumentWriter::new();

            writer.begin_document()?;
            writer.write_name(resolved.path.as_str())?;
            writer.begin_document()?;
            writer.write_name(*op)?;
            writer.begin_array()?;
            for item in items {
                write_operand(&mut writer, item, &item_encoder, &resolved.path)?;
            }
            writer.end_array()?;
            writer.end_document()?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::Geometry { field, op, geometry } => {
            let resolved = field.resolve(schema, registry)?;
            let geometry = bson::to_bson(geometry)
                .chain_with(|| format!("can't encode geometry operand for field `{}`", resolved.path))?;
            let mut writer = DocumentWriter::new();

            writer.begin_document()?;
            writer.write_name(resolved.path.as_str())?;
            writer.begin_document()?;
            writer.write_name(*op)?;
            writer.begin_document()?;
            writer.write_name("$geometry")?;
            writer.write_bson(geometry)?;
            writer.end_document()?;
            writer.end_document()?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::Near { field, point, spherical, max_distance, min_distance } => {
            let resolved = field.resolve(schema, registry)?;
            let point = bson::to_bson(point)
                .chain_with(|| format!("can't encode near point for field `{}`", resolved.path))?;
            let op = if *spherical { "$nearSphere" } else { "$near" };
            let mut writer = DocumentWriter::new();

            writer.begin_document()?;
            writer.write_name(resolved.path.as_str())?;
            writer.begin_document()?;
            writer.write_name(op)?;
            writer.begin_document()?;
            writer.write_name("$geometry")?;
            writer.write_bson(point)?;
            if let Some(max_distance) = max_distance {
                writer.write_name("$maxDistance")?;
                writer.write_bson(*max_distance)?;
            }
            if let Some(min_distance) = min_distance {
                writer.write_name("$minDistance")?;
                writer.write_bson(*min_distance)?;
            }
            writer.end_document()?;
            writer.end_document()?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::ElemMatch { field, inner } => {
            let resolved = field.resolve(schema, registry)?;
            let item_encoder = resolved.element_encoder()?;
            let item_schema: Arc<dyn DocumentSchema> = item_encoder
                .as_schema()
                .unwrap_or_else(|| Arc::new(EmptySchema));
            let mut body = render_node(inner, item_schema.as_ref(), registry)?;

            fix_up_scalar_element(&mut body);

            let mut writer = DocumentWriter::new();
            writer.begin_document()?;
            writer.write_name(resolved.path.as_str())?;
            writer.begin_document()?;
            writer.write_name("$elemMatch")?;
            writer.write_bson(body)?;
            writer.end_document()?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::ArrayIndexExists { field, index, exists } => {
            let resolved = field.resolve(schema, registry)?;
            let mut writer = DocumentWriter::new();

            writer.begin_document()?;
            writer.write_name(format!("{}.{}", resolved.path, index))?;
            writer.begin_document()?;
            writer.write_name("$exists")?;
            writer.write_bson(*exists)?;
            writer.end_document()?;
            writer.end_document()?;

            writer.finish()
        }

        FilterNode::And(children) => {
            let mut combined = Document::new();

            for child in children {
                let rendered = render_node(child, schema, registry)?;
                for (name, value) in rendered {
                    add_clause(&mut combined, name, value)?;
                }
            }

            Ok(combined)
        }

        FilterNode::Or(children) => {
            let mut clauses = Vec::with_capacity(children.len());

            for child in children {
                let rendered = render_node(child, schema, registry)?;
                match sole_element(rendered) {
                    Ok((name, Bson::Array(nested))) if name == "$or" => clauses.extend(nested),
                    Ok((name, value)) => clauses.push(Bson::Document(one(name, value))),
                    Err(rendered) => clauses.push(Bson::Document(rendered)),
                }
            }

            Ok(one("$or", Bson::Array(clauses)))
        }

        FilterNode::Not(child) => Ok(negate(render_node(child, schema, registry)?)),

        FilterNode::Raw(document) => Ok(document.clone()),

        FilterNode::Expression(expression) => expression.compile(schema, registry),
    }
}

/// Streams one operand into the writer's current slot.
fn write_operand(
    writer: &mut DocumentWriter,
    operand: &Operand,
    encoder: &Arc<dyn ValueEncoder>,
    path: &str,
) -> Result<()> {
    match operand {
        Operand::Value(bson) => writer.write_bson(bson.clone()),
        Operand::Typed(value) => encoder
            .write(writer, value.as_any())
            .chain_with(|| format!("can't encode operand for field `{}`", path)),
    }
}

/// Folds one rendered clause into a conjunction accumulator.
///
/// Clauses with distinct names coexist in the flat form; two operator
/// documents on the same field merge if their key sets are disjoint; any
/// other collision promotes the whole accumulator to an explicit `$and`.
fn add_clause(combined: &mut Document, name: String, value: Bson) -> Result<()> {
    if name == "$and" {
        // a child was itself an explicit conjunction: fold its clauses
        let nested = match value {
            Bson::Array(nested) => nested,
            other => return Err(Error::new(
                ErrorKind::InvalidFilter,
                format!("the value of `$and` must be an array, got {:?}", other.element_type()),
            )),
        };

        for clause in nested {
            let clause = match clause {
                Bson::Document(clause) => clause,
                other => return Err(Error::new(
                    ErrorKind::InvalidFilter,
                    format!("`$and` clauses must be documents, got {:?}", other.element_type()),
                )),
            };

            for (n, v) in clause {
                add_clause(combined, n, v)?;
            }
        }

        Ok(())
    } else if is_sole_and(combined) {
        // already escalated: append the clause as its own document
        if let Some(Bson::Array(clauses)) = combined.get_mut("$and") {
            clauses.push(Bson::Document(one(name, value)));
            return Ok(());
        }

        promote(combined, name, value);
        Ok(())
    } else if combined.contains_key(&name) {
        let mergeable = match (combined.get(&name), &value) {
            (Some(Bson::Document(existing)), Bson::Document(incoming)) => {
                incoming.keys().all(|key| !existing.contains_key(key))
            }
            _ => false,
        };

        if mergeable {
            if let (Some(Bson::Document(existing)), Bson::Document(incoming))
                = (combined.get_mut(&name), value)
            {
                for (key, item) in incoming {
                    existing.insert(key, item);
                }
            }
            Ok(())
        } else {
            promote(combined, name, value);
            Ok(())
        }
    } else {
        combined.insert(name, value);
        Ok(())
    }
}

/// Whether the accumulator consists of a single `$and` clause.
fn is_sole_and(combined: &Document) -> bool {
    combined.len() == 1
        && combined.iter().next().map(|(key, _)| key.as_str() == "$and").unwrap_or(false)
}

/// Moves every element of the accumulator into an explicit `$and` array,
/// appending the conflicting clause as its own one-element document.
fn promote(combined: &mut Document, name: String, value: Bson) {
    let current = std::mem::take(combined);
    let mut clauses: Vec<Bson> = current
        .into_iter()
        .map(|(n, v)| Bson::Document(one(n, v)))
        .collect();

    clauses.push(Bson::Document(one(name, value)));
    combined.insert("$and", Bson::Array(clauses));
}

/// Lowers the negation of an already-rendered filter.
fn negate(rendered: Document) -> Document {
    let mut elements = rendered.into_iter();

    match (elements.next(), elements.next()) {
        (Some((name, value)), None) => negate_single(name, value),
        (first, second) => {
            let mut rebuilt = Document::new();
            for (n, v) in first.into_iter().chain(second).chain(elements) {
                rebuilt.insert(n, v);
            }
            negate_arbitrary(rebuilt)
        }
    }
}

/// Negation of a one-element filter `{name: value}`.
fn negate_single(name: String, value: Bson) -> Document {
    if name.starts_with('$') {
        // a top-level operator
        match name.as_str() {
            "$or" => one("$nor", value),
            "$nor" => one("$or", value),
            _ => negate_arbitrary(one(name, value)),
        }
    } else {
        // a field selector
        match value {
            Bson::Document(operand) => {
                let operator_form = operand
                    .iter()
                    .next()
                    .map(|(key, _)| key.starts_with('$') && key != "$ref")
                    .unwrap_or(false);

                if operator_form {
                    match sole_element(operand) {
                        Ok((op, op_value)) => negate_operator(name, op, op_value),
                        Err(operand) => negate_arbitrary(one(name, Bson::Document(operand))),
                    }
                } else {
                    // a plain document literal: negated equality
                    wrap(name, "$ne", Bson::Document(operand))
                }
            }
            regex @ Bson::RegularExpression(_) => wrap(name, "$not", regex),
            value => wrap(name, "$ne", value),
        }
    }
}

/// Negation of a single field operator, per the server's support for `$not`
/// inside a field selector.
fn negate_operator(field: String, op: String, value: Bson) -> Document {
    match op.as_str() {
        "$exists" => match value {
            Bson::Boolean(exists) => wrap(field, "$exists", Bson::Boolean(!exists)),
            other => wrap_not(field, op, other),
        },
        "$in" => wrap(field, "$nin", value),
        "$nin" => wrap(field, "$in", value),
        "$ne" => one(field, value),
        "$not" => one(field, value),
        _ => wrap_not(field, op, value),
    }
}

/// The always-correct (if verbose) negation: `{$nor: [filter]}`.
fn negate_arbitrary(rendered: Document) -> Document {
    one("$nor", Bson::Array(vec![Bson::Document(rendered)]))
}

/// Rewrites the scalar-array form of an element-match body: an inner clause
/// keyed by the empty string (the convention for "the element itself") is
/// folded into the body so that no empty key reaches the server.
fn fix_up_scalar_element(body: &mut Document) {
    if let Some(condition) = body.remove("") {
        match condition {
            Bson::Document(operators) => {
                for (op, value) in operators {
                    body.insert(op, value);
                }
            }
            regex @ Bson::RegularExpression(_) => {
                body.insert("$regex", regex);
            }
            value => {
                body.insert("$eq", value);
            }
        }
    }
}

/// Splits off a document's sole element, or gives the document back.
fn sole_element(document: Document) -> std::result::Result<(String, Bson), Document> {
    let mut elements = document.into_iter();

    match (elements.next(), elements.next()) {
        (Some(element), None) => Ok(element),
        (first, second) => {
            let mut rebuilt = Document::new();
            for (n, v) in first.into_iter().chain(second).chain(elements) {
                rebuilt.insert(n, v);
            }
            Err(rebuilt)
        }
    }
}

/// A one-element document.
fn one(name: impl Into<String>, value: impl Into<Bson>) -> Document {
    let mut document = Document::new();
    document.insert(name, value);
    document
}

/// `{field: {op: value}}`.
fn wrap(field: impl Into<String>, op: impl Into<String>, value: Bson) -> Document {
    one(field, Bson::Document(one(op, value)))
}

/// `{field: {$not: {op: value}}}`.
fn wrap_not(field: String, op: String, value: Bson) -> Document {
    wrap(field, "$not", Bson::Document(one(op, value)))
}

#[cfg(test)]
mod tests {
    use bson::Bson;
    use crate::error::Result;
    use super::{ add_clause, fix_up_scalar_element, negate, sole_element };

    #[test]
    fn clauses_with_distinct_names_stay_flat() -> Result<()> {
        let mut combined = doc!{};

        add_clause(&mut combined, "a".into(), Bson::Int32(1))?;
        add_clause(&mut combined, "b".into(), Bson::Int32(2))?;

        assert_eq!(combined, doc!{ "a": 1, "b": 2 });

        Ok(())
    }

    #[test]
    fn disjoint_operator_documents_merge() -> Result<()> {
        let mut combined = doc!{};

        add_clause(&mut combined, "x".into(), bson!({ "$gt": 1 }))?;
        add_clause(&mut combined, "x".into(), bson!({ "$lt": 10 }))?;

        assert_eq!(combined, doc!{ "x": { "$gt": 1, "$lt": 10 } });

        Ok(())
    }

    #[test]
    fn conflicting_clauses_promote_and_keep_appending() -> Result<()> {
        let mut combined = doc!{};

        add_clause(&mut combined, "x".into(), bson!({ "$gt": 1 }))?;
        add_clause(&mut combined, "x".into(), bson!({ "$gt": 2 }))?;
        add_clause(&mut combined, "y".into(), Bson::Int32(3))?;

        assert_eq!(combined, doc!{
            "$and": [
                { "x": { "$gt": 1 } },
                { "x": { "$gt": 2 } },
                { "y": 3 },
            ]
        });

        Ok(())
    }

    #[test]
    fn nested_and_arrays_fold_flat() -> Result<()> {
        let mut combined = doc!{};

        add_clause(&mut combined, "$and".into(), bson!([
            { "a": 1 },
            { "b": 2 },
        ]))?;
        add_clause(&mut combined, "c".into(), Bson::Int32(3))?;

        assert_eq!(combined, doc!{ "a": 1, "b": 2, "c": 3 });

        Ok(())
    }

    #[test]
    fn non_array_and_is_rejected() {
        let mut combined = doc!{};

        assert!(add_clause(&mut combined, "$and".into(), Bson::Int32(1)).is_err());
    }

    #[test]
    fn value_and_operator_collision_promotes() -> Result<()> {
        let mut combined = doc!{};

        add_clause(&mut combined, "x".into(), Bson::Int32(5))?;
        add_clause(&mut combined, "x".into(), bson!({ "$lt": 10 }))?;

        assert_eq!(combined, doc!{
            "$and": [
                { "x": 5 },
                { "x": { "$lt": 10 } },
            ]
        });

        Ok(())
    }

    #[test]
    fn negation_table() {
        assert_eq!(negate(doc!{ "x": 5 }),
                   doc!{ "x": { "$ne": 5 } });
        assert_eq!(negate(doc!{ "x": { "$in": [1, 2] } }),
                   doc!{ "x": { "$nin": [1, 2] } });
        assert_eq!(negate(doc!{ "x": { "$nin": [1, 2] } }),
                   doc!{ "x": { "$in": [1, 2] } });
        assert_eq!(negate(doc!{ "x": { "$exists": true } }),
                   doc!{ "x": { "$exists": false } });
        assert_eq!(negate(doc!{ "x": { "$exists": false } }),
                   doc!{ "x": { "$exists": true } });
        assert_eq!(negate(doc!{ "x": { "$ne": 5 } }),
                   doc!{ "x": 5 });
        assert_eq!(negate(doc!{ "x": { "$not": { "$gt": 1 } } }),
                   doc!{ "x": { "$gt": 1 } });
        assert_eq!(negate(doc!{ "x": { "$gt": 1 } }),
                   doc!{ "x": { "$not": { "$gt": 1 } } });
        assert_eq!(negate(doc!{ "$or": [{ "a": 1 }] }),
                   doc!{ "$nor": [{ "a": 1 }] });
        assert_eq!(negate(doc!{ "$nor": [{ "a": 1 }] }),
                   doc!{ "$or": [{ "a": 1 }] });
    }

    #[test]
    fn negation_fallbacks() {
        // multiple clauses
        assert_eq!(negate(doc!{ "a": 1, "b": 2 }),
                   doc!{ "$nor": [{ "a": 1, "b": 2 }] });
        // multiple operators on one field
        assert_eq!(negate(doc!{ "x": { "$gt": 1, "$lt": 10 } }),
                   doc!{ "$nor": [{ "x": { "$gt": 1, "$lt": 10 } }] });
        // other top-level operator
        assert_eq!(negate(doc!{ "$and": [{ "a": 1 }] }),
                   doc!{ "$nor": [{ "$and": [{ "a": 1 }] }] });
        // a non-boolean `$exists` operand is negated generically
        assert_eq!(negate(doc!{ "x": { "$exists": 1 } }),
                   doc!{ "x": { "$not": { "$exists": 1 } } });
        // a plain document literal is a negated equality
        assert_eq!(negate(doc!{ "x": { "sub": 1 } }),
                   doc!{ "x": { "$ne": { "sub": 1 } } });
    }

    #[test]
    fn scalar_element_fix_up() {
        let mut body = doc!{ "": { "$gt": 5 }, "other": 1 };
        fix_up_scalar_element(&mut body);
        assert_eq!(body, doc!{ "other": 1, "$gt": 5 });

        let mut body = doc!{ "": 7 };
        fix_up_scalar_element(&mut body);
        assert_eq!(body, doc!{ "$eq": 7 });

        let mut body = doc!{
            "": Bson::RegularExpression(bson::Regex {
                pattern: "^a".into(),
                options: String::new(),
            }),
        };
        fix_up_scalar_element(&mut body);
        assert_eq!(body, doc!{
            "$regex": Bson::RegularExpression(bson::Regex {
                pattern: "^a".into(),
                options: String::new(),
            }),
        });
    }

    #[test]
    fn sole_element_splits_only_singletons() {
        assert_eq!(sole_element(doc!{ "a": 1 }), Ok(("a".into(), Bson::Int32(1))));
        assert_eq!(sole_element(doc!{ "a": 1, "b": 2 }), Err(doc!{ "a": 1, "b": 2 }));
        assert_eq!(sole_element(doc!{}), Err(doc!{}));
    }
}
