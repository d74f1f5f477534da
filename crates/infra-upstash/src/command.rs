// Redis commands used by the queue, in REST wire form

/// One sorted-set command; serialized as a JSON array of strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    ZAdd { key: &'a str, score: i64, member: &'a str },
    ZRange { key: &'a str, start: usize, stop: usize },
    ZRem { key: &'a str, member: &'a str },
    /// Removes scores strictly below `cutoff`
    ZRemRangeByScoreBelow { key: &'a str, cutoff: i64 },
    ZCard { key: &'a str },
    Expire { key: &'a str, seconds: u64 },
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ZAdd { .. } => "ZADD",
            Command::ZRange { .. } => "ZRANGE",
            Command::ZRem { .. } => "ZREM",
            Command::ZRemRangeByScoreBelow { .. } => "ZREMRANGEBYSCORE",
            Command::ZCard { .. } => "ZCARD",
            Command::Expire { .. } => "EXPIRE",
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        match self {
            Command::ZAdd { key, score, member } => {
                args.extend([key.to_string(), score.to_string(), member.to_string()])
            }
            Command::ZRange { key, start, stop } => {
                args.extend([key.to_string(), start.to_string(), stop.to_string()])
            }
            Command::ZRem { key, member } => args.extend([key.to_string(), member.to_string()]),
            // "(" makes the upper bound exclusive
            Command::ZRemRangeByScoreBelow { key, cutoff } => {
                args.extend([key.to_string(), "-inf".to_string(), format!("({}", cutoff)])
            }
            Command::ZCard { key } => args.push(key.to_string()),
            Command::Expire { key, seconds } => {
                args.extend([key.to_string(), seconds.to_string()])
            }
        }
        args
    }
}
