use crate::backend::RankToken;

/// Where a registration stands among the live tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RankPosition {
    Leader,
    /// Not the lowest token: watch `predecessor`, the token right before ours.
    Follower {
        leader: RankToken,
        predecessor: RankToken,
    },
    /// Our token is not among the live tokens any more.
    Unregistered,
}

/// Leader iff `mine` is the minimum of the live tokens.
pub fn rank_position(live_tokens: &[RankToken], mine: &RankToken) -> RankPosition {
    let mut sorted: Vec<&RankToken> = live_tokens.iter().collect();
    sorted.sort();

    let index = match sorted.iter().position(|token| *token == mine) {
        Some(index) => index,
        None => return RankPosition::Unregistered,
    };

    if index == 0 {
        return RankPosition::Leader;
    }

    RankPosition::Follower {
        leader: sorted[0].clone(),
        predecessor: sorted[index - 1].clone(),
    }
}
