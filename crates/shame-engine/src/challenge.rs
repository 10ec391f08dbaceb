//! Math problems that must be solved before a wake-up is accepted.

use rand::Rng;
use shame_types::models::{MathOperation, MathProblem};

use crate::config::GameConfig;

/// Builds a problem from raw operands. Subtraction operands are reordered
/// so the answer is never negative.
pub fn new_problem(operand1: i64, operand2: i64, operation: MathOperation) -> MathProblem {
    match operation {
        MathOperation::Addition => MathProblem {
            operand1,
            operand2,
            operation,
            correct_answer: operand1 + operand2,
        },
        MathOperation::Subtraction => {
            let larger = operand1.max(operand2);
            let smaller = operand1.min(operand2);
            MathProblem {
                operand1: larger,
                operand2: smaller,
                operation,
                correct_answer: larger - smaller,
            }
        }
    }
}

/// Picks an operation uniformly and two operands from the configured range.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, config: &GameConfig) -> MathProblem {
    let operation = if rng.random_bool(0.5) {
        MathOperation::Addition
    } else {
        MathOperation::Subtraction
    };
    let operand1 = rng.random_range(config.operand_min..=config.operand_max);
    let operand2 = rng.random_range(config.operand_min..=config.operand_max);
    new_problem(operand1, operand2, operation)
}

pub fn is_correct(problem: &MathProblem, answer: i64) -> bool {
    problem.correct_answer == answer
}
