use novelkit::{BudgetRequest, ToolkitError, TokenBudgetPlanner};
use proptest::prelude::*;

fn valid_request() -> impl Strategy<Value = BudgetRequest> {
    (
        1i64..=2_000_000,
        0i64..=2_500_000,
        1i64..=256_000,
        1i64..=64_000,
        0i64..=128_000,
        1i64..=128_000,
    )
        .prop_map(
            |(
                context_window,
                prompt_tokens,
                max_output_tokens_cap,
                desired_output_tokens,
                requested_thinking_tokens,
                thinking_hard_cap,
            )| BudgetRequest {
                context_window,
                prompt_tokens,
                max_output_tokens_cap,
                desired_output_tokens,
                requested_thinking_tokens,
                thinking_hard_cap,
            },
        )
}

proptest! {
    #[test]
    fn caps_are_never_exceeded(req in valid_request()) {
        let result = TokenBudgetPlanner::plan(&req).unwrap();
        prop_assert!(result.max_tokens <= req.max_output_tokens_cap);
        prop_assert!(result.thinking_budget <= req.thinking_hard_cap);
    }

    #[test]
    fn available_is_exact_difference(req in valid_request()) {
        let result = TokenBudgetPlanner::plan(&req).unwrap();
        prop_assert_eq!(result.available_tokens, req.context_window - req.prompt_tokens);
    }

    #[test]
    fn planning_is_idempotent(req in valid_request()) {
        let first = TokenBudgetPlanner::plan(&req).unwrap();
        let second = TokenBudgetPlanner::plan(&req).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn larger_prompt_never_grows_budget(req in valid_request(), extra in 0i64..=500_000) {
        let bigger = BudgetRequest { prompt_tokens: req.prompt_tokens + extra, ..req };
        let small = TokenBudgetPlanner::plan(&req).unwrap();
        let large = TokenBudgetPlanner::plan(&bigger).unwrap();
        prop_assert!(large.max_tokens <= small.max_tokens);
        prop_assert!(large.thinking_budget <= small.thinking_budget);
    }

    #[test]
    fn overflowing_prompt_is_never_sufficient(req in valid_request()) {
        let result = TokenBudgetPlanner::plan(&req).unwrap();
        if result.available_tokens < 0 {
            prop_assert!(!result.sufficient);
        }
    }

    #[test]
    fn full_window_leaves_no_room(req in valid_request()) {
        let full = BudgetRequest { prompt_tokens: req.context_window, ..req };
        let result = TokenBudgetPlanner::plan(&full).unwrap();
        prop_assert_eq!(result.available_tokens, 0);
        prop_assert_eq!(result.max_tokens, 0);
        prop_assert!(result.thinking_budget <= 0);
        if full.requested_thinking_tokens > 0 {
            prop_assert!(!result.sufficient);
        }
    }

    #[test]
    fn clamp_lands_exactly_on_cap(
        cap in 1i64..=32_000,
        desired in 1i64..=16_000,
        headroom in 1i64..=50_000,
    ) {
        // unclamped thinking budget = cap + headroom
        let max_tokens = cap + headroom + desired;
        let req = BudgetRequest {
            context_window: max_tokens + 10_000,
            prompt_tokens: 10_000,
            max_output_tokens_cap: max_tokens,
            desired_output_tokens: desired,
            requested_thinking_tokens: cap,
            thinking_hard_cap: cap,
        };
        let result = TokenBudgetPlanner::plan(&req).unwrap();
        prop_assert_eq!(result.thinking_budget, cap);
        prop_assert!(result.thinking_clamped);
        prop_assert!(result.sufficient);
    }

    #[test]
    fn non_positive_window_is_rejected(req in valid_request(), window in -1_000i64..=0) {
        let bad = BudgetRequest { context_window: window, ..req };
        let is_invalid = matches!(
            TokenBudgetPlanner::plan(&bad),
            Err(ToolkitError::InvalidArgument(_))
        );
        prop_assert!(is_invalid);
    }

    #[test]
    fn full_range_inputs_never_wrap(
        context_window in 1i64..=i64::MAX,
        prompt_tokens in 0i64..=i64::MAX,
        max_output_tokens_cap in 1i64..=i64::MAX,
        desired_output_tokens in 1i64..=i64::MAX,
        requested_thinking_tokens in 0i64..=i64::MAX,
        thinking_hard_cap in 1i64..=i64::MAX,
    ) {
        let req = BudgetRequest {
            context_window,
            prompt_tokens,
            max_output_tokens_cap,
            desired_output_tokens,
            requested_thinking_tokens,
            thinking_hard_cap,
        };
        match TokenBudgetPlanner::plan(&req) {
            Ok(result) => {
                prop_assert!(result.max_tokens <= max_output_tokens_cap);
                prop_assert!(result.thinking_budget <= thinking_hard_cap);
                if result.available_tokens < 0 {
                    prop_assert!(!result.sufficient);
                }
            }
            Err(err) => {
                let is_invalid = matches!(err, ToolkitError::InvalidArgument(_));
                prop_assert!(is_invalid);
            }
        }
    }
}
