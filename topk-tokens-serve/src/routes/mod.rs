pub(crate) mod topk_tokens;
