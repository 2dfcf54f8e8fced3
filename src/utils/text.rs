/// 去掉首尾空白并把连续空白压缩成一个空格
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 第一条非空行，清理后返回
pub fn first_line(text: &str) -> String {
    text.lines()
        .map(clean_text)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

/// 去掉全部空白后的文本，用来判断两处文本是否出自同一节点
///
/// 块级元素在不同环境里渲染出的换行不一致，去掉空白后可以直接比较
pub fn text_fingerprint(text: &str) -> String {
    text.split_whitespace().collect()
}
