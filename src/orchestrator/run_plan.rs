//! 运行计划
//!
//! 根据账本已有记录数、prompt 总数和输出上限，算出本次的工作区间

use std::fmt;

/// 无需处理的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NothingToDo {
    /// 账本记录数已达到输出上限
    LimitAlreadyReached { limit: usize },
    /// 所有 prompt 都已处理
    AllProcessed,
}

impl fmt::Display for NothingToDo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NothingToDo::LimitAlreadyReached { limit } => {
                write!(f, "输出上限 {} 已达到", limit)
            }
            NothingToDo::AllProcessed => write!(f, "所有 prompt 均已处理"),
        }
    }
}

/// 本次运行的计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPlan {
    Done(NothingToDo),
    /// 工作区间 `[start, end)`
    Work { start: usize, end: usize },
}

impl RunPlan {
    /// # 参数
    /// - `processed`: 账本中已有的记录数（续跑游标）
    /// - `total`: prompt 总数
    /// - `limit`: 输出上限，`None` 表示不限制
    pub fn compute(processed: usize, total: usize, limit: Option<usize>) -> Self {
        if let Some(limit) = limit {
            if processed >= limit {
                return RunPlan::Done(NothingToDo::LimitAlreadyReached { limit });
            }
        }
        if processed >= total {
            return RunPlan::Done(NothingToDo::AllProcessed);
        }

        let remaining_prompts = total - processed;
        let remaining = match limit {
            Some(limit) => (limit - processed).min(remaining_prompts),
            None => remaining_prompts,
        };
        if remaining == 0 {
            return RunPlan::Done(NothingToDo::AllProcessed);
        }

        RunPlan::Work {
            start: processed,
            end: processed + remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_caps_slice() {
        assert_eq!(RunPlan::compute(0, 5, Some(3)), RunPlan::Work { start: 0, end: 3 });
        assert_eq!(RunPlan::compute(2, 10, Some(3)), RunPlan::Work { start: 2, end: 3 });
    }

    #[test]
    fn test_prompts_cap_slice() {
        assert_eq!(RunPlan::compute(4, 6, Some(100)), RunPlan::Work { start: 4, end: 6 });
        assert_eq!(RunPlan::compute(4, 6, None), RunPlan::Work { start: 4, end: 6 });
    }

    #[test]
    fn test_limit_already_reached() {
        assert_eq!(
            RunPlan::compute(3, 5, Some(3)),
            RunPlan::Done(NothingToDo::LimitAlreadyReached { limit: 3 })
        );
        assert_eq!(
            RunPlan::compute(0, 5, Some(0)),
            RunPlan::Done(NothingToDo::LimitAlreadyReached { limit: 0 })
        );
    }

    #[test]
    fn test_all_processed() {
        assert_eq!(RunPlan::compute(5, 5, None), RunPlan::Done(NothingToDo::AllProcessed));
        assert_eq!(RunPlan::compute(7, 5, Some(10)), RunPlan::Done(NothingToDo::AllProcessed));
        assert_eq!(RunPlan::compute(0, 0, None), RunPlan::Done(NothingToDo::AllProcessed));
    }
}
