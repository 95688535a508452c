use took::Took;

use crate::solution::ProblemSolution;

pub fn format_log_method_solution_timed(method: &str, sol: &ProblemSolution, took: Took) -> String {
    format!("{method} - {}, took: {took}", format_log_solution(sol))
}

pub fn format_log_solution(sol: &ProblemSolution) -> String {
    format!(
        "{:.3}/{:.3}/{:.3} (dist/empty/price, feasible: {})",
        sol.total_distance,
        sol.empty_distance,
        sol.total_price,
        sol.is_feasible(),
    )
}
