use arrow_schema::Schema;

use crate::expr::Expr;

/// Turns an opaque query-engine predicate into its statistics-checkable
/// form.
///
/// `None` marks a predicate the statistics level cannot express. Such a
/// predicate is ignored for the current call (every block passes it) and is
/// never cached; it stays a valid cache key for engines whose other
/// predicates do translate. Translation failure is expected, not an error.
pub trait PredicateTranslator<P> {
    fn translate(&self, predicate: &P, schema: &Schema) -> Option<Expr>;
}

impl<P, F> PredicateTranslator<P> for F
where
    F: Fn(&P, &Schema) -> Option<Expr>,
{
    fn translate(&self, predicate: &P, schema: &Schema) -> Option<Expr> {
        self(predicate, schema)
    }
}

/// Identity translator for callers whose predicates already are [`Expr`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ExprTranslator;

impl PredicateTranslator<Expr> for ExprTranslator {
    fn translate(&self, predicate: &Expr, _schema: &Schema) -> Option<Expr> {
        Some(predicate.clone())
    }
}
