//! Themed tag clusters.

use once_cell::sync::Lazy;
use regex::Regex;

use super::keyword_regex;
use promolens_core::ActivityTag;

/// Priority order matters: a flash sale over a holiday is a flash sale.
static TAG_CLUSTERS: Lazy<Vec<(ActivityTag, Regex)>> = Lazy::new(|| {
    [
        (
            ActivityTag::FlashSale,
            &["限时", "秒杀", "抢购", "闪购", "限量", "flash sale", "limited time"][..],
        ),
        (
            ActivityTag::Holiday,
            &[
                "节日", "春节", "国庆", "中秋", "五一", "元旦", "圣诞", "端午", "假期",
                "holiday", "festival", "christmas", "new year",
            ][..],
        ),
        (
            ActivityTag::Promotional,
            &[
                "促销", "特惠", "优惠", "折扣", "满减", "立减", "特价", "promotion",
                "discount", "deal", "coupon",
            ][..],
        ),
        (
            ActivityTag::Seasonal,
            &[
                "夏季", "冬季", "春季", "秋季", "暑期", "暑假", "寒假", "夏日", "summer",
                "winter", "spring", "autumn", "seasonal",
            ][..],
        ),
        (
            ActivityTag::NewArrival,
            &[
                "新品", "新店", "首发", "新上线", "新开业", "new arrival", "new opening",
                "grand opening", "launch",
            ][..],
        ),
        (
            ActivityTag::Membership,
            &["会员", "积分", "专享", "vip", "member", "loyalty", "genius"][..],
        ),
        (
            ActivityTag::Bestseller,
            &[
                "爆款", "热销", "人气", "畅销", "best seller", "bestseller", "popular",
                "top rated",
            ][..],
        ),
    ]
    .into_iter()
    .filter_map(|(tag, terms)| keyword_regex(terms).map(|re| (tag, re)))
    .collect()
});

/// First matching cluster in priority order, else `Other`.
pub fn classify_tag(text: &str) -> ActivityTag {
    TAG_CLUSTERS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(tag, _)| *tag)
        .unwrap_or(ActivityTag::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_not_position() {
        // The holiday term appears first in the text, flash sale still wins.
        assert_eq!(classify_tag("国庆出游 限时秒杀"), ActivityTag::FlashSale);
        assert_eq!(classify_tag("春节特惠"), ActivityTag::Holiday);
    }

    #[test]
    fn test_each_cluster() {
        assert_eq!(classify_tag("满减优惠"), ActivityTag::Promotional);
        assert_eq!(classify_tag("暑期亲子房"), ActivityTag::Seasonal);
        assert_eq!(classify_tag("新店开张"), ActivityTag::NewArrival);
        assert_eq!(classify_tag("Genius member rate"), ActivityTag::Membership);
        assert_eq!(classify_tag("爆款房型"), ActivityTag::Bestseller);
        assert_eq!(classify_tag("Summer Deal"), ActivityTag::Promotional);
    }

    #[test]
    fn test_default_other() {
        assert_eq!(classify_tag("房态日历"), ActivityTag::Other);
        assert_eq!(classify_tag("dealership"), ActivityTag::Other);
    }
}
