use crate::ast;
use crate::asg::{BinaryOperator, Expression, UnaryOperator};
use crate::builder::{AsgBuilder, Scope};
use crate::diagnostics::DiagnosticKind;
use crate::error::{Abort, BuildResult, StructuralError};

impl AsgBuilder<'_> {
    pub(crate) fn build_expression(
        &mut self,
        expression: &ast::Expression,
        scope: Scope,
    ) -> BuildResult<Expression> {
        match &expression.kind {
            ast::ExpressionKind::Literal(literal) => Ok(Expression::Literal(literal.clone())),
            ast::ExpressionKind::Access(chain) => {
                Ok(Expression::Access(self.resolve_access(chain, scope)?))
            }
            ast::ExpressionKind::OldValue(chain) => {
                if !scope.allows_old_values() {
                    return Err(self.report(
                        DiagnosticKind::InvalidOldValue,
                        "old values can only be read in ensures contracts",
                        expression.span,
                    ));
                }
                Ok(Expression::OldValue(self.resolve_access(chain, scope)?))
            }
            ast::ExpressionKind::Unary(unary) => {
                let operator = UnaryOperator::from_token(&unary.operator).ok_or_else(|| {
                    StructuralError::new(
                        format!("unknown unary operator '{}'", unary.operator),
                        expression.span,
                    )
                })?;
                let operand = self.build_expression(&unary.operand, scope)?;
                Ok(Expression::Unary {
                    operator,
                    operand: Box::new(operand),
                })
            }
            ast::ExpressionKind::Binary(binary) => {
                let operator = BinaryOperator::from_token(&binary.operator).ok_or_else(|| {
                    StructuralError::new(
                        format!("unknown binary operator '{}'", binary.operator),
                        expression.span,
                    )
                })?;
                // Build both sides so that errors on the right are reported too.
                let left = self.build_expression(&binary.left, scope);
                let right = self.build_expression(&binary.right, scope);
                let (left, right) = match (left, right) {
                    (Ok(left), Ok(right)) => (left, right),
                    (Err(Abort::Structural(error)), _) | (_, Err(Abort::Structural(error))) => {
                        return Err(Abort::Structural(error))
                    }
                    (Err(abort), _) | (_, Err(abort)) => return Err(abort),
                };
                Ok(Expression::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            ast::ExpressionKind::Grouping(inner) => self.build_expression(inner, scope),
        }
    }
}
