//! The filter algebra: strongly-typed, immutable filter terms over a
//! document type, plus the constructors that build them.
//!
//! Constructors come in two parallel forms. The associated functions on
//! [`Filter`] take any field representation (usually a raw dotted path) and
//! pre-encoded BSON operands:
//!
//! ```
//! # use mango::prelude::*;
//! #
//! let filter = Filter::<()>::and(vec![
//!     Filter::gt("qty", 1),
//!     Filter::lt("qty", 10),
//! ]);
//!
//! let rendered = filter.render(&EmptySchema, &EncoderRegistry::new())?;
//! assert_eq!(rendered, doc!{ "qty": { "$gt": 1, "$lt": 10 } });
//! # Ok::<(), MangoError>(())
//! ```
//!
//! The methods on [`TypedField`] take host-language literals of the field's
//! declared type and defer their encoding to render time:
//!
//! ```
//! # use mango::prelude::*;
//! #
//! struct Inventory;
//!
//! let qty = field::<Inventory, i64>("qty");
//! let rendered = qty.gt(100).render(&EmptySchema, &EncoderRegistry::new())?;
//! assert_eq!(rendered, doc!{ "qty": { "$gt": 100_i64 } });
//! # Ok::<(), MangoError>(())
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use bson::{ Bson, Document, Regex };
use crate::encode::{ AnyValue, Encode, EncoderRegistry };
use crate::error::Result;
use crate::field::{ Field, IntoField, TypedField };
use crate::geo::{ Geometry, Position };
use crate::literal::{ BsonType, RegexOpts };
use crate::schema::DocumentSchema;

/// A literal operand of a field predicate.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A pre-encoded BSON value, emitted verbatim.
    Value(Bson),
    /// A typed host value, encoded at render time by the field's encoder.
    Typed(Box<dyn AnyValue>),
}

impl Operand {
    /// Wraps a pre-encoded BSON value.
    pub fn value<B: Into<Bson>>(value: B) -> Self {
        Operand::Value(value.into())
    }

    /// Captures a typed host value for render-time encoding.
    pub fn typed<F: Encode>(value: F) -> Self {
        Operand::Typed(Box::new(value))
    }
}

/// A predicate compiled to a filter document by an external collaborator,
/// e.g. an expression-to-BSON compiler. Rendering delegates to it verbatim.
pub trait CompileFilter: fmt::Debug + Send + Sync {
    /// Produces the filter document for this predicate.
    fn compile(
        &self,
        schema: &dyn DocumentSchema,
        registry: &EncoderRegistry,
    ) -> Result<Document>;
}

/// A pre-compiled filter document is its own compilation.
impl CompileFilter for Document {
    fn compile(
        &self,
        _schema: &dyn DocumentSchema,
        _registry: &EncoderRegistry,
    ) -> Result<Document> {
        Ok(self.clone())
    }
}

/// Options of the `$text` operator. Every field is emitted only if set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOptions {
    /// The `$language` of the search.
    pub language: Option<String>,
    /// The `$caseSensitive` toggle.
    pub case_sensitive: Option<bool>,
    /// The `$diacriticSensitive` toggle.
    pub diacritic_sensitive: Option<bool>,
}

impl TextOptions {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search language.
    pub fn language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets case sensitivity.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    /// Sets diacritic sensitivity.
    pub fn diacritic_sensitive(mut self, diacritic_sensitive: bool) -> Self {
        self.diacritic_sensitive = Some(diacritic_sensitive);
        self
    }
}

/// The tagged representation of a filter term. Immutable once constructed;
/// rendering is a pure function of the term and its collaborators.
#[derive(Debug, Clone)]
pub enum FilterNode {
    /// `{path: value}`: a field matched against a literal.
    Simple {
        /// The matched field.
        field: Field,
        /// The literal.
        value: Operand,
    },
    /// `{path: {op: value}}`: one server operator applied to one field.
    Operator {
        /// The matched field.
        field: Field,
        /// The server operator, e.g. `$gt`.
        op: &'static str,
        /// The operand.
        value: Operand,
    },
    /// `{path: {op: [items…]}}`: `$in` / `$nin` / `$all`; items are encoded
    /// with the field's *element* encoder.
    ArrayOperator {
        /// The matched field.
        field: Field,
        /// The server operator.
        op: &'static str,
        /// The operand list.
        items: Vec<Operand>,
    },
    /// `{path: {op: {$geometry: …}}}`: a geospatial operator with a
    /// structured geometry operand.
    Geometry {
        /// The matched field.
        field: Field,
        /// The server operator, `$geoIntersects` or `$geoWithin`.
        op: &'static str,
        /// The geometry operand.
        geometry: Geometry,
    },
    /// `{path: {$near|$nearSphere: {$geometry: …, $maxDistance?, $minDistance?}}}`.
    Near {
        /// The matched field.
        field: Field,
        /// The reference point.
        point: Geometry,
        /// Whether to use spherical geometry (`$nearSphere`).
        spherical: bool,
        /// Maximum distance in meters, if bounded.
        max_distance: Option<f64>,
        /// Minimum distance in meters, if bounded.
        min_distance: Option<f64>,
    },
    /// `{path: {$elemMatch: …}}`: a subfilter over the array element type.
    ElemMatch {
        /// The matched array field.
        field: Field,
        /// The subfilter, with paths relative to the element.
        inner: Box<FilterNode>,
    },
    /// `{path.index: {$exists: bool}}`: synthetic form for size-range
    /// predicates over arrays.
    ArrayIndexExists {
        /// The matched array field.
        field: Field,
        /// The element index probed for existence.
        index: i64,
        /// Whether the element must exist or must not.
        exists: bool,
    },
    /// Conjunction of subfilters.
    And(
        /// The subfilters.
        Vec<FilterNode>,
    ),
    /// Disjunction of subfilters.
    Or(
        /// The subfilters.
        Vec<FilterNode>,
    ),
    /// Negation of a subfilter.
    Not(
        /// The negated subfilter.
        Box<FilterNode>,
    ),
    /// A pre-built filter document, passed through as-is.
    Raw(
        /// The document.
        Document,
    ),
    /// An opaque predicate lowered by an external compiler.
    Expression(
        /// The compiler-side artifact.
        Arc<dyn CompileFilter>,
    ),
}

/// An immutable filter over documents of type `D`.
///
/// The type parameter is phantom: it ties typed field handles to the
/// document type they were declared for and carries no data. Terms are
/// constructed by the associated functions below and by the operator
/// methods on [`TypedField`].
pub struct Filter<D> {
    /// The erased term.
    node: FilterNode,
    /// Anchors the document type.
    marker: PhantomData<fn(D) -> D>,
}

impl<D> fmt::Debug for Filter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({:?})", self.node)
    }
}

impl<D> Clone for Filter<D> {
    fn clone(&self) -> Self {
        Filter::from_node(self.node.clone())
    }
}

impl<D> Filter<D> {
    /// Wraps an erased term.
    pub(crate) fn from_node(node: FilterNode) -> Self {
        Filter { node, marker: PhantomData }
    }

    /// A view of the underlying term.
    pub fn node(&self) -> &FilterNode {
        &self.node
    }

    /// Unwraps the underlying term.
    pub fn into_node(self) -> FilterNode {
        self.node
    }

    /// Renders the filter to its canonical BSON document form.
    ///
    /// Rendering is pure: it takes only immutable collaborators and returns
    /// a freshly allocated document, so the same filter may be rendered
    /// concurrently from multiple threads.
    pub fn render(
        &self,
        schema: &dyn DocumentSchema,
        registry: &EncoderRegistry,
    ) -> Result<Document> {
        crate::render::render_node(&self.node, schema, registry)
    }

    /// The filter matching every document: `{}`.
    pub fn empty() -> Self {
        Self::from_node(FilterNode::Raw(Document::new()))
    }

    /// `{field: value}`: field equals the value.
    pub fn eq<P: IntoField<D>, B: Into<Bson>>(field: P, value: B) -> Self {
        Self::from_node(FilterNode::Simple {
            field: field.into_field(),
            value: Operand::value(value),
        })
    }

    /// `{field: {$ne: value}}`.
    pub fn ne<P: IntoField<D>, B: Into<Bson>>(field: P, value: B) -> Self {
        Self::operator(field, "$ne", value)
    }

    /// `{field: {$gt: value}}`.
    pub fn gt<P: IntoField<D>, B: Into<Bson>>(field: P, value: B) -> Self {
        Self::operator(field, "$gt", value)
    }

    /// `{field: {$gte: value}}`.
    pub fn gte<P: IntoField<D>, B: Into<Bson>>(field: P, value: B) -> Self {
        Self::operator(field, "$gte", value)
    }

    /// `{field: {$lt: value}}`.
    pub fn lt<P: IntoField<D>, B: Into<Bson>>(field: P, value: B) -> Self {
        Self::operator(field, "$lt", value)
    }

    /// `{field: {$lte: value}}`.
    pub fn lte<P: IntoField<D>, B: Into<Bson>>(field: P, value: B) -> Self {
        Self::operator(field, "$lte", value)
    }

    /// `{field: {$exists: exists}}`.
    pub fn exists<P: IntoField<D>>(field: P, exists: bool) -> Self {
        Self::operator(field, "$exists", exists)
    }

    /// `{field: {$in: [values…]}}`.
    pub fn is_in<P, I>(field: P, values: I) -> Self
        where P: IntoField<D>,
              I: IntoIterator,
              I::Item: Into<Bson>,
    {
        Self::array_operator(field, "$in", values)
    }

    /// `{field: {$nin: [values…]}}`.
    pub fn not_in<P, I>(field: P, values: I) -> Self
        where P: IntoField<D>,
              I: IntoIterator,
              I::Item: Into<Bson>,
    {
        Self::array_operator(field, "$nin", values)
    }

    /// `{field: {$all: [values…]}}`.
    pub fn all<P, I>(field: P, values: I) -> Self
        where P: IntoField<D>,
              I: IntoIterator,
              I::Item: Into<Bson>,
    {
        Self::array_operator(field, "$all", values)
    }

    /// `{field: {$size: size}}`: array length equals `size` exactly.
    pub fn size<P: IntoField<D>>(field: P, size: i64) -> Self {
        Self::operator(field, "$size", size)
    }

    /// Array length greater than `size`: `{field.size: {$exists: true}}`.
    pub fn size_gt<P: IntoField<D>>(field: P, size: i64) -> Self {
        Self::array_index_exists(field, size, true)
    }

    /// Array length greater than or equal to `size`.
    pub fn size_gte<P: IntoField<D>>(field: P, size: i64) -> Self {
        Self::array_index_exists(field, size - 1, true)
    }

    /// Array length less than `size`.
    pub fn size_lt<P: IntoField<D>>(field: P, size: i64) -> Self {
        Self::array_index_exists(field, size - 1, false)
    }

    /// Array length less than or equal to `size`.
    pub fn size_lte<P: IntoField<D>>(field: P, size: i64) -> Self {
        Self::array_index_exists(field, size, false)
    }

    /// `{field: {$elemMatch: inner}}`: the array contains an element
    /// matching the subfilter. `E` is the element type; for scalar arrays,
    /// build the subfilter on [`elem`](crate::field::elem).
    pub fn elem_match<P: IntoField<D>, E>(field: P, inner: Filter<E>) -> Self {
        Self::from_node(FilterNode::ElemMatch {
            field: field.into_field(),
            inner: Box::new(inner.into_node()),
        })
    }

    /// `{field: /pattern/options}`: the field matches a regular expression.
    pub fn regex<P: IntoField<D>, S: Into<String>>(
        field: P,
        pattern: S,
        options: RegexOpts,
    ) -> Self {
        Self::from_node(FilterNode::Simple {
            field: field.into_field(),
            value: Operand::Value(Bson::RegularExpression(Regex {
                pattern: pattern.into(),
                options: options.letters(),
            })),
        })
    }

    /// `{field: {$type: types}}`: the field is of one of the given types.
    pub fn of_type<P: IntoField<D>>(field: P, types: BsonType) -> Self {
        Self::operator(field, "$type", types)
    }

    /// `{field: {$mod: [divisor, remainder]}}`.
    pub fn modulo<P: IntoField<D>>(field: P, divisor: i64, remainder: i64) -> Self {
        Self::operator(field, "$mod", bson!([divisor, remainder]))
    }

    /// The conjunction of the subfilters.
    pub fn and<I: IntoIterator<Item = Filter<D>>>(filters: I) -> Self {
        Self::from_node(FilterNode::And(
            filters.into_iter().map(Filter::into_node).collect(),
        ))
    }

    /// The disjunction of the subfilters.
    pub fn or<I: IntoIterator<Item = Filter<D>>>(filters: I) -> Self {
        Self::from_node(FilterNode::Or(
            filters.into_iter().map(Filter::into_node).collect(),
        ))
    }

    /// The negation of the subfilter.
    pub fn not(filter: Filter<D>) -> Self {
        Self::from_node(FilterNode::Not(Box::new(filter.into_node())))
    }

    /// `{$text: {$search: search, …}}`: full-text search. A top-level
    /// operator; it applies to the collection's text index, not to a field.
    pub fn text<S: Into<String>>(search: S, options: TextOptions) -> Self {
        let mut spec = Document::new();
        spec.insert("$search", search.into());

        if let Some(language) = options.language {
            spec.insert("$language", language);
        }
        if let Some(case_sensitive) = options.case_sensitive {
            spec.insert("$caseSensitive", case_sensitive);
        }
        if let Some(diacritic_sensitive) = options.diacritic_sensitive {
            spec.insert("$diacriticSensitive", diacritic_sensitive);
        }

        let mut filter = Document::new();
        filter.insert("$text", spec);

        Self::raw(filter)
    }

    /// A pre-built filter document, passed through unchanged.
    pub fn raw(document: Document) -> Self {
        Self::from_node(FilterNode::Raw(document))
    }

    /// An opaque predicate whose lowering is delegated to an external
    /// compiler at render time.
    pub fn expr<E: CompileFilter + 'static>(expression: E) -> Self {
        Self::from_node(FilterNode::Expression(Arc::new(expression)))
    }

    /// `{field: {$geoIntersects: {$geometry: geometry}}}`.
    pub fn geo_intersects<P: IntoField<D>>(field: P, geometry: Geometry) -> Self {
        Self::from_node(FilterNode::Geometry {
            field: field.into_field(),
            op: "$geoIntersects",
            geometry,
        })
    }

    /// `{field: {$geoWithin: {$geometry: geometry}}}`.
    pub fn geo_within<P: IntoField<D>>(field: P, geometry: Geometry) -> Self {
        Self::from_node(FilterNode::Geometry {
            field: field.into_field(),
            op: "$geoWithin",
            geometry,
        })
    }

    /// `{field: {$geoWithin: {$box: [[x1, y1], [x2, y2]]}}}`: within a
    /// flat-geometry rectangle given by two opposite corners.
    pub fn geo_within_box<P: IntoField<D>>(
        field: P,
        lower_left_x: f64,
        lower_left_y: f64,
        upper_right_x: f64,
        upper_right_y: f64,
    ) -> Self {
        Self::operator(field, "$geoWithin", bson!({
            "$box": [[lower_left_x, lower_left_y], [upper_right_x, upper_right_y]],
        }))
    }

    /// `{field: {$geoWithin: {$center: [[x, y], radius]}}}`: within a
    /// flat-geometry circle.
    pub fn geo_within_center<P: IntoField<D>>(field: P, x: f64, y: f64, radius: f64) -> Self {
        Self::operator(field, "$geoWithin", bson!({
            "$center": [[x, y], radius],
        }))
    }

    /// `{field: {$geoWithin: {$centerSphere: [[x, y], radius]}}}`: within
    /// a spherical-geometry circle; the radius is in radians.
    pub fn geo_within_center_sphere<P: IntoField<D>>(
        field: P,
        x: f64,
        y: f64,
        radius: f64,
    ) -> Self {
        Self::operator(field, "$geoWithin", bson!({
            "$centerSphere": [[x, y], radius],
        }))
    }

    /// `{field: {$geoWithin: {$polygon: [[x, y]…]}}}`: within a
    /// flat-geometry polygon.
    pub fn geo_within_polygon<P, I>(field: P, points: I) -> Self
        where P: IntoField<D>,
              I: IntoIterator<Item = Position>,
    {
        let points: Vec<Bson> = points
            .into_iter()
            .map(|p| bson!([p[0], p[1]]))
            .collect();

        Self::operator(field, "$geoWithin", bson!({ "$polygon": points }))
    }

    /// `{field: {$near: {$geometry: point, …}}}`: near a point, closest
    /// first, optionally bounded by distances in meters.
    pub fn near<P: IntoField<D>>(
        field: P,
        point: Geometry,
        max_distance: Option<f64>,
        min_distance: Option<f64>,
    ) -> Self {
        Self::from_node(FilterNode::Near {
            field: field.into_field(),
            point,
            spherical: false,
            max_distance,
            min_distance,
        })
    }

    /// `{field: {$nearSphere: {$geometry: point, …}}}`: like
    /// [`near`](Filter::near) but with spherical geometry.
    pub fn near_sphere<P: IntoField<D>>(
        field: P,
        point: Geometry,
        max_distance: Option<f64>,
        min_distance: Option<f64>,
    ) -> Self {
        Self::from_node(FilterNode::Near {
            field: field.into_field(),
            point,
            spherical: true,
            max_distance,
            min_distance,
        })
    }

    /// Builds a single-operator term with a pre-encoded operand.
    fn operator<P: IntoField<D>, B: Into<Bson>>(field: P, op: &'static str, value: B) -> Self {
        Self::from_node(FilterNode::Operator {
            field: field.into_field(),
            op,
            value: Operand::value(value),
        })
    }

    /// Builds an array-operator term with pre-encoded items.
    fn array_operator<P, I>(field: P, op: &'static str, values: I) -> Self
        where P: IntoField<D>,
              I: IntoIterator,
              I::Item: Into<Bson>,
    {
        Self::from_node(FilterNode::ArrayOperator {
            field: field.into_field(),
            op,
            items: values.into_iter().map(Operand::value).collect(),
        })
    }

    /// Builds the synthetic element-existence term.
    fn array_index_exists<P: IntoField<D>>(field: P, index: i64, exists: bool) -> Self {
        Self::from_node(FilterNode::ArrayIndexExists {
            field: field.into_field(),
            index,
            exists,
        })
    }
}

/// Operator constructors taking literals of the field's declared type.
impl<D, F: Encode> TypedField<D, F> {
    /// `{field: value}`: the field equals the value.
    pub fn eq(self, value: F) -> Filter<D> {
        Filter::from_node(FilterNode::Simple {
            field: self.into_erased(),
            value: Operand::typed(value),
        })
    }

    /// `{field: {$ne: value}}`.
    pub fn ne(self, value: F) -> Filter<D> {
        self.typed_operator("$ne", value)
    }

    /// `{field: {$gt: value}}`.
    pub fn gt(self, value: F) -> Filter<D> {
        self.typed_operator("$gt", value)
    }

    /// `{field: {$gte: value}}`.
    pub fn gte(self, value: F) -> Filter<D> {
        self.typed_operator("$gte", value)
    }

    /// `{field: {$lt: value}}`.
    pub fn lt(self, value: F) -> Filter<D> {
        self.typed_operator("$lt", value)
    }

    /// `{field: {$lte: value}}`.
    pub fn lte(self, value: F) -> Filter<D> {
        self.typed_operator("$lte", value)
    }

    /// `{field: {$exists: exists}}`.
    pub fn exists(self, exists: bool) -> Filter<D> {
        Filter::exists(self.into_erased(), exists)
    }

    /// `{field: {$type: types}}`.
    pub fn of_type(self, types: BsonType) -> Filter<D> {
        Filter::of_type(self.into_erased(), types)
    }

    /// `{field: /pattern/options}`.
    pub fn regex<S: Into<String>>(self, pattern: S, options: RegexOpts) -> Filter<D> {
        Filter::regex(self.into_erased(), pattern, options)
    }

    /// `{field: {$mod: [divisor, remainder]}}`.
    pub fn modulo(self, divisor: i64, remainder: i64) -> Filter<D> {
        Filter::modulo(self.into_erased(), divisor, remainder)
    }

    /// Builds a single-operator term with a typed operand.
    fn typed_operator(self, op: &'static str, value: F) -> Filter<D> {
        Filter::from_node(FilterNode::Operator {
            field: self.into_erased(),
            op,
            value: Operand::typed(value),
        })
    }
}

/// Array-operator constructors, available on array-typed fields only.
/// Their operand lists are encoded with the field's *element* encoder.
impl<D, T: Encode> TypedField<D, Vec<T>> {
    /// `{field: {$in: [values…]}}`.
    pub fn is_in<I: IntoIterator<Item = T>>(self, values: I) -> Filter<D> {
        self.typed_array_operator("$in", values)
    }

    /// `{field: {$nin: [values…]}}`.
    pub fn not_in<I: IntoIterator<Item = T>>(self, values: I) -> Filter<D> {
        self.typed_array_operator("$nin", values)
    }

    /// `{field: {$all: [values…]}}`.
    pub fn all<I: IntoIterator<Item = T>>(self, values: I) -> Filter<D> {
        self.typed_array_operator("$all", values)
    }

    /// `{field: {$elemMatch: inner}}`: the array contains an element
    /// matching the subfilter over the element type.
    pub fn elem_match(self, inner: Filter<T>) -> Filter<D> {
        Filter::elem_match(self.into_erased(), inner)
    }

    /// `{field: {$size: size}}`.
    pub fn size(self, size: i64) -> Filter<D> {
        Filter::size(self.into_erased(), size)
    }

    /// Array length greater than `size`.
    pub fn size_gt(self, size: i64) -> Filter<D> {
        Filter::size_gt(self.into_erased(), size)
    }

    /// Array length greater than or equal to `size`.
    pub fn size_gte(self, size: i64) -> Filter<D> {
        Filter::size_gte(self.into_erased(), size)
    }

    /// Array length less than `size`.
    pub fn size_lt(self, size: i64) -> Filter<D> {
        Filter::size_lt(self.into_erased(), size)
    }

    /// Array length less than or equal to `size`.
    pub fn size_lte(self, size: i64) -> Filter<D> {
        Filter::size_lte(self.into_erased(), size)
    }

    /// Builds an array-operator term with typed items.
    fn typed_array_operator<I: IntoIterator<Item = T>>(
        self,
        op: &'static str,
        values: I,
    ) -> Filter<D> {
        Filter::from_node(FilterNode::ArrayOperator {
            field: self.into_erased(),
            op,
            items: values.into_iter().map(Operand::typed).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::field::field;
    use super::*;

    #[test]
    fn size_bounds_lower_to_index_existence() {
        let assert_lowering = |filter: Filter<()>, index: i64, exists: bool| {
            match filter.node() {
                FilterNode::ArrayIndexExists { index: i, exists: e, .. } => {
                    assert_eq!((*i, *e), (index, exists));
                }
                other => panic!("unexpected lowering: {:?}", other),
            }
        };

        assert_lowering(Filter::size_gt("tags", 3), 3, true);
        assert_lowering(Filter::size_gte("tags", 3), 2, true);
        assert_lowering(Filter::size_lt("tags", 3), 2, false);
        assert_lowering(Filter::size_lte("tags", 3), 3, false);

        assert_lowering(field::<(), Vec<i32>>("tags").size_gt(1), 1, true);
        assert_lowering(field::<(), Vec<i32>>("tags").size_gte(1), 0, true);
    }

    #[test]
    fn typed_operands_are_captured_not_encoded() {
        let filter = field::<(), i64>("qty").gt(5);

        match filter.node() {
            FilterNode::Operator { op, value: Operand::Typed(_), .. } => {
                assert_eq!(*op, "$gt");
            }
            other => panic!("unexpected term: {:?}", other),
        }
    }

    #[test]
    fn text_options_are_emitted_iff_set() {
        let plain = Filter::<()>::text("coffee", TextOptions::new());
        match plain.node() {
            FilterNode::Raw(doc) => {
                assert_eq!(*doc, doc!{ "$text": { "$search": "coffee" } });
            }
            other => panic!("unexpected term: {:?}", other),
        }

        let tuned = Filter::<()>::text(
            "kávé",
            TextOptions::new().language("hu").case_sensitive(true),
        );
        match tuned.node() {
            FilterNode::Raw(doc) => {
                assert_eq!(*doc, doc!{
                    "$text": {
                        "$search": "kávé",
                        "$language": "hu",
                        "$caseSensitive": true,
                    }
                });
            }
            other => panic!("unexpected term: {:?}", other),
        }
    }
}
