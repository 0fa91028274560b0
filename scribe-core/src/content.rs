//! Questionnaire content: Likert blocks, authorship options and the
//! instruction comprehension check.
//!
//! Item ids here are the single source of truth for what the backend
//! accepts (see [`crate::fields`]).

use crate::storage::{POST_A_ORDER_KEY, SharedStorage};
use rand::Rng;

pub struct LikertItem {
    pub id: &'static str,
    pub stem: &'static str,
}

pub struct LikertBlock {
    pub id: &'static str,
    pub title: &'static str,
    pub items: &'static [LikertItem],
}

/// Baseline questionnaire: writing self-efficacy and attitudes toward AI.
pub const BASELINE_BLOCKS: &[LikertBlock] = &[
    LikertBlock {
        id: "wse",
        title: "寫作自我效能",
        items: &[
            LikertItem { id: "wse1", stem: "我能寫出條理清楚的故事。" },
            LikertItem { id: "wse2", stem: "我能想出有趣的故事情節。" },
            LikertItem { id: "wse3", stem: "我能用恰當的詞彙表達想法。" },
            LikertItem { id: "wse4", stem: "即使主題困難，我也能完成寫作。" },
            LikertItem { id: "wse5", stem: "我對自己的寫作能力有信心。" },
        ],
    },
    LikertBlock {
        id: "aiatt",
        title: "對 AI 的態度",
        items: &[
            LikertItem { id: "aiatt1", stem: "我認為 AI 工具對寫作有幫助。" },
            LikertItem { id: "aiatt2", stem: "我願意在寫作時使用 AI 工具。" },
            LikertItem { id: "aiatt3", stem: "我信任 AI 工具產生的建議。" },
            LikertItem { id: "aiatt4", stem: "我擔心使用 AI 會影響我的寫作能力。" },
        ],
    },
];

/// First post-task questionnaire. Block order is randomized once per
/// session (see [`post_a_order`]).
pub const POST_A_BLOCKS: &[LikertBlock] = &[
    LikertBlock {
        id: "pq",
        title: "作品品質",
        items: &[
            LikertItem { id: "pq1", stem: "我對這篇故事的品質感到滿意。" },
            LikertItem { id: "pq2", stem: "這篇故事展現了我的創意。" },
            LikertItem { id: "pq3", stem: "這篇故事的結構完整。" },
            LikertItem { id: "pq4", stem: "我願意把這篇故事分享給別人。" },
        ],
    },
    LikertBlock {
        id: "baa",
        title: "行為歸因",
        items: &[
            LikertItem { id: "baa1", stem: "故事的主要想法來自我自己。" },
            LikertItem { id: "baa2", stem: "我主導了整個寫作過程。" },
            LikertItem { id: "baa3", stem: "AI 助手影響了故事的發展方向。" },
            LikertItem { id: "baa4", stem: "最終文字大多是我自己寫的。" },
        ],
    },
    LikertBlock {
        id: "ia",
        title: "想法歸屬",
        items: &[
            LikertItem { id: "ia1", stem: "我覺得這篇故事是屬於我的作品。" },
            LikertItem { id: "ia2", stem: "我對這篇故事有擁有感。" },
            LikertItem { id: "ia3", stem: "這篇故事反映了我個人的風格。" },
            LikertItem { id: "ia4", stem: "我覺得自己是這篇故事的作者。" },
        ],
    },
    LikertBlock {
        id: "pau",
        title: "AI 使用感受",
        items: &[
            LikertItem { id: "pau1", stem: "AI 助手的回應符合我的需求。" },
            LikertItem { id: "pau2", stem: "與 AI 助手互動的過程順暢。" },
            LikertItem { id: "pau3", stem: "AI 助手的建議啟發了我的想法。" },
            LikertItem { id: "pau4", stem: "我依賴 AI 助手來完成這項任務。" },
        ],
    },
];

/// Second post-task questionnaire.
pub const POST_B_BLOCKS: &[LikertBlock] = &[
    LikertBlock {
        id: "pmd",
        title: "心理距離",
        items: &[
            LikertItem { id: "pmd1", stem: "完成任務後，我感覺與這篇故事很親近。" },
            LikertItem { id: "pmd2", stem: "這篇故事對我有個人意義。" },
            LikertItem { id: "pmd3", stem: "我會記得這篇故事的內容。" },
            LikertItem { id: "pmd4", stem: "我在寫作時投入了情感。" },
        ],
    },
    LikertBlock {
        id: "pct",
        title: "貢獻感知",
        items: &[
            LikertItem { id: "pct1", stem: "整體而言，我的貢獻多於 AI 的貢獻。" },
            LikertItem { id: "pct2", stem: "沒有 AI 協助我也能寫出類似的故事。" },
            LikertItem { id: "pct3", stem: "AI 的建議在故事中佔了重要部分。" },
            LikertItem { id: "pct4", stem: "我清楚知道哪些部分來自 AI。" },
        ],
    },
];

/// Authorship attribution options, in presentation order. The stored
/// answer is the 1-based index.
pub const AUTHORSHIP_OPTIONS: &[&str] = &[
    "僅標示本人為唯一作者（不提及 AI 協助）",
    "標示本人為作者，並註明曾使用 AI 協助",
    "標示本人與 AI 為共同作者",
    "標示 AI 為主要作者，本人為協助者",
    "僅標示 AI 為作者",
    "不標示任何作者",
    "其他（請於下方說明）",
];

pub const COMPREHENSION_QUESTION: &str = "在接下來的寫作任務中，下列敘述何者正確？";

pub const COMPREHENSION_OPTIONS: &[&str] = &[
    "我必須在每一句話都使用 AI 助手的建議",
    "我可以自由決定是否採用 AI 助手的建議",
    "AI 助手會自動替我完成整篇故事",
    "寫作期間不能與 AI 助手互動",
];

/// Index into [`COMPREHENSION_OPTIONS`] of the correct answer.
pub const COMPREHENSION_CORRECT_INDEX: usize = 1;

pub fn baseline_ids() -> Vec<&'static str> {
    block_ids(BASELINE_BLOCKS)
}

pub fn post_a_ids() -> Vec<&'static str> {
    block_ids(POST_A_BLOCKS)
}

pub fn post_b_ids() -> Vec<&'static str> {
    block_ids(POST_B_BLOCKS)
}

fn block_ids(blocks: &'static [LikertBlock]) -> Vec<&'static str> {
    blocks
        .iter()
        .flat_map(|b| b.items.iter().map(|i| i.id))
        .collect()
}

/// Every Likert item id across all questionnaires.
pub fn all_item_ids() -> Vec<&'static str> {
    let mut ids = baseline_ids();
    ids.extend(post_a_ids());
    ids.extend(post_b_ids());
    ids
}

/// Block presentation order for the first post-task questionnaire:
/// shuffled once per session and persisted, so a reload shows the same
/// order the participant already saw.
pub fn post_a_order(storage: &SharedStorage) -> Vec<usize> {
    let n = POST_A_BLOCKS.len();

    if let Some(saved) = storage
        .lock()
        .expect("storage lock poisoned")
        .get(POST_A_ORDER_KEY)
        && let Ok(order) = serde_json::from_str::<Vec<usize>>(&saved)
        && is_permutation(&order, n)
    {
        return order;
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = rand::rng();
    // Fisher-Yates
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        order.swap(i, j);
    }

    let mut guard = storage.lock().expect("storage lock poisoned");
    guard.set(
        POST_A_ORDER_KEY,
        &serde_json::to_string(&order).unwrap_or_default(),
    );
    order
}

fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in order {
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}
